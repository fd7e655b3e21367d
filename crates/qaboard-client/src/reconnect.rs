//! Swappable reconnect strategies for the push connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const MAX_BACKOFF_SHIFT: u32 = 16;

/// Decides whether and when to retry after the push connection ends.
pub trait ReconnectPolicy: Send + Sync + fmt::Debug {
    /// `attempt` is 1 for the first retry after the last successful open.
    /// `None` leaves the connection disconnected.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// One connection per session; a dropped stream stays dropped.
pub struct NoReconnect;

impl ReconnectPolicy for NoReconnect {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateReconnect {
    pub max_attempts: u32,
}

impl ReconnectPolicy for ImmediateReconnect {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(Duration::ZERO)
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl ExponentialBackoff {
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay_ms
            .max(1)
            .saturating_mul(1_u64 << shift)
            .min(self.max_delay_ms.max(1))
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(Duration::from_millis(self.delay_ms(attempt)))
    }

    fn name(&self) -> &'static str {
        "backoff"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Plain-data selector used by configuration layers.
pub enum ReconnectStrategy {
    #[default]
    None,
    Immediate {
        max_attempts: u32,
    },
    Backoff {
        base_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: u32,
    },
}

impl ReconnectStrategy {
    pub fn into_policy(self) -> Arc<dyn ReconnectPolicy> {
        match self {
            Self::None => Arc::new(NoReconnect),
            Self::Immediate { max_attempts } => Arc::new(ImmediateReconnect { max_attempts }),
            Self::Backoff {
                base_delay_ms,
                max_delay_ms,
                max_attempts,
            } => Arc::new(ExponentialBackoff {
                base_delay_ms,
                max_delay_ms,
                max_attempts,
            }),
        }
    }
}
