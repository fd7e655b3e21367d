use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use qaboard_client::{
    push_url_from_api_base, AdminReconcilePolicy, BoardApiConfig, BoardSessionConfig,
    ConnectionConfig, ReconnectStrategy, DEFAULT_API_BASE,
};
use qaboard_sync::UnknownUpdatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CliReconnectMode {
    None,
    Immediate,
    Backoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CliUnknownUpdateMode {
    Drop,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CliAdminReconcileMode {
    PushOnly,
    Optimistic,
}

#[derive(Debug, Parser)]
#[command(
    name = "qaboard",
    about = "Terminal client for a live question-and-answer board",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "QABOARD_API_BASE",
        default_value = DEFAULT_API_BASE,
        help = "Base URL of the board HTTP service"
    )]
    pub(crate) api_base: String,

    #[arg(
        long = "ws-url",
        env = "QABOARD_WS_URL",
        help = "Push stream URL. Defaults to the api base with a ws/wss scheme and /ws/questions path"
    )]
    pub(crate) ws_url: Option<String>,

    #[arg(
        long = "state-file",
        env = "QABOARD_STATE_FILE",
        default_value = ".qaboard/session.json",
        help = "Where the admin credential and display name are kept between runs"
    )]
    pub(crate) state_file: PathBuf,

    #[arg(
        long = "page-size",
        env = "QABOARD_PAGE_SIZE",
        default_value_t = 10,
        help = "Questions per page"
    )]
    pub(crate) page_size: usize,

    #[arg(
        long = "keepalive-interval-ms",
        env = "QABOARD_KEEPALIVE_INTERVAL_MS",
        default_value_t = 30_000,
        help = "Interval between keepalive frames while the push stream is open"
    )]
    pub(crate) keepalive_interval_ms: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "QABOARD_REQUEST_TIMEOUT_MS",
        default_value_t = 0,
        help = "HTTP request timeout; 0 waits indefinitely"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long,
        env = "QABOARD_RECONNECT",
        value_enum,
        default_value = "none",
        help = "What to do when the push stream drops"
    )]
    pub(crate) reconnect: CliReconnectMode,

    #[arg(
        long = "reconnect-max-attempts",
        env = "QABOARD_RECONNECT_MAX_ATTEMPTS",
        default_value_t = 5,
        help = "Consecutive reconnect attempts before giving up"
    )]
    pub(crate) reconnect_max_attempts: u32,

    #[arg(
        long = "reconnect-base-delay-ms",
        env = "QABOARD_RECONNECT_BASE_DELAY_MS",
        default_value_t = 500,
        help = "First backoff delay; doubles per attempt"
    )]
    pub(crate) reconnect_base_delay_ms: u64,

    #[arg(
        long = "reconnect-max-delay-ms",
        env = "QABOARD_RECONNECT_MAX_DELAY_MS",
        default_value_t = 30_000,
        help = "Upper bound for a single backoff delay"
    )]
    pub(crate) reconnect_max_delay_ms: u64,

    #[arg(
        long = "unknown-update",
        env = "QABOARD_UNKNOWN_UPDATE",
        value_enum,
        default_value = "drop",
        help = "Handling of QUESTION_UPDATED events for questions not on the board"
    )]
    pub(crate) unknown_update: CliUnknownUpdateMode,

    #[arg(
        long = "admin-reconcile",
        env = "QABOARD_ADMIN_RECONCILE",
        value_enum,
        default_value = "optimistic",
        help = "Apply accepted admin actions immediately or wait for the push update"
    )]
    pub(crate) admin_reconcile: CliAdminReconcileMode,

    #[arg(
        long = "user-name",
        env = "QABOARD_USER_NAME",
        help = "Display name for questions and answers; persisted to the state file"
    )]
    pub(crate) user_name: Option<String>,
}

impl Cli {
    pub(crate) fn api_config(&self) -> BoardApiConfig {
        BoardApiConfig {
            api_base: self.api_base.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub(crate) fn push_url(&self) -> String {
        self.ws_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| push_url_from_api_base(&self.api_base))
    }

    pub(crate) fn reconnect_strategy(&self) -> ReconnectStrategy {
        match self.reconnect {
            CliReconnectMode::None => ReconnectStrategy::None,
            CliReconnectMode::Immediate => ReconnectStrategy::Immediate {
                max_attempts: self.reconnect_max_attempts,
            },
            CliReconnectMode::Backoff => ReconnectStrategy::Backoff {
                base_delay_ms: self.reconnect_base_delay_ms,
                max_delay_ms: self.reconnect_max_delay_ms,
                max_attempts: self.reconnect_max_attempts,
            },
        }
    }

    pub(crate) fn session_config(&self) -> Result<BoardSessionConfig> {
        if self.page_size == 0 {
            bail!("--page-size must be greater than 0");
        }
        if self.keepalive_interval_ms == 0 {
            bail!("--keepalive-interval-ms must be greater than 0");
        }
        Ok(BoardSessionConfig {
            page_size: self.page_size,
            unknown_update_policy: match self.unknown_update {
                CliUnknownUpdateMode::Drop => UnknownUpdatePolicy::Drop,
                CliUnknownUpdateMode::Insert => UnknownUpdatePolicy::Insert,
            },
            admin_reconcile: match self.admin_reconcile {
                CliAdminReconcileMode::PushOnly => AdminReconcilePolicy::PushOnly,
                CliAdminReconcileMode::Optimistic => AdminReconcilePolicy::Optimistic,
            },
            connection: ConnectionConfig {
                ws_url: self.push_url(),
                keepalive_interval: Duration::from_millis(self.keepalive_interval_ms),
                ..ConnectionConfig::default()
            },
            reconnect: self.reconnect_strategy(),
        })
    }
}
