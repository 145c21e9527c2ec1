// src/errors.rs

// error handling for the window limiter type

// dependencies
use std::time::Duration;

use crate::config::TimeUnit;
use crate::ledger::ReservationId;

/// Reasons a `WindowLimiterConfig` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be positive")]
    ZeroCapacity,
    #[error("capacity {requested} exceeds the maximum of {max}")]
    CapacityTooLarge { requested: usize, max: usize },
    #[error("time unit {0:?} is not allowed, use seconds, minutes, hours or days")]
    UnsupportedUnit(TimeUnit),
    #[error("window length must be positive")]
    ZeroWindow,
    #[error("sweep interval must be positive")]
    ZeroSweepInterval,
}

/// Error type for the WindowLimiter.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum WindowLimiterError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("no tokio runtime available to run the expiry sweeper")]
    SweeperUnavailable,
    #[error("acquire cancelled before a permit was granted")]
    Cancelled,
    #[error("no permit became available within {0:?}")]
    TimedOut(Duration),
    #[error("limiter has been shut down")]
    Closed,
    #[error("reservation {0} is already recorded")]
    DuplicateReservation(ReservationId),
}

impl WindowLimiterError {
    /// Whether the caller simply did not get a permit this time and may retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WindowLimiterError::Cancelled | WindowLimiterError::TimedOut(_)
        )
    }
}
