use std::io::IsTerminal;

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log directives for the board client. Takes precedence over `RUST_LOG`.
pub(crate) const LOG_DIRECTIVES_ENV: &str = "QABOARD_LOG";

fn board_log_filter(directives: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());
    match directives.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    }
}

/// Logs go to stderr; stdout carries the rendered board.
pub(crate) fn init_tracing() -> Result<()> {
    let directives = std::env::var(LOG_DIRECTIVES_ENV).ok();
    let stderr_is_terminal = std::io::stderr().is_terminal();

    tracing_subscriber::fmt()
        .with_env_filter(board_log_filter(directives.as_deref()))
        .with_target(false)
        .with_ansi(stderr_is_terminal)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|error| anyhow!("failed to initialise logging: {error}"))
}
