// src/config.rs

//! Configuration types for the window limiter

// dependencies
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::errors::ConfigError;

const DEFAULT_WINDOW_LENGTH: u32 = 1;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 500;

/// Unit a window is expressed in.
///
/// Every unit can be named, but only the coarse ones (seconds and up) are
/// accepted by [`WindowLimiterConfig::validate`]: reservations are reclaimed
/// on a sweep tick, so the limiter cannot honour sub-second windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in seconds, or `None` if the unit is too fine-grained.
    pub fn as_secs(self) -> Option<u64> {
        match self {
            TimeUnit::Seconds => Some(1),
            TimeUnit::Minutes => Some(60),
            TimeUnit::Hours => Some(3_600),
            TimeUnit::Days => Some(86_400),
            _ => None,
        }
    }
}

/// Configuration for window limiter behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLimiterConfig {
    pub(crate) capacity: usize,
    pub(crate) unit: TimeUnit,
    #[serde(default = "default_window_length")]
    pub(crate) window_length: u32,
    #[serde(default = "default_sweep_interval_ms")]
    pub(crate) sweep_interval_ms: u64,
}

fn default_window_length() -> u32 {
    DEFAULT_WINDOW_LENGTH
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

impl WindowLimiterConfig {
    /// Create a configuration admitting `capacity` operations per one `unit`
    pub fn new(capacity: usize, unit: TimeUnit) -> Self {
        Self {
            capacity,
            unit,
            window_length: DEFAULT_WINDOW_LENGTH,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }

    /// Builder-style: set capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder-style: set the window unit
    pub fn unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Builder-style: set how many units the window spans
    pub fn window_length(mut self, window_length: u32) -> Self {
        self.window_length = window_length;
        self
    }

    /// Builder-style: set how often expired reservations are swept.
    /// Millisecond granularity; anything finer is truncated.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = interval.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn sweep_interval_duration(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// The window as a duration, if unit and length are acceptable
    pub fn window(&self) -> Result<Duration, ConfigError> {
        let unit_secs = self
            .unit
            .as_secs()
            .ok_or(ConfigError::UnsupportedUnit(self.unit))?;
        if self.window_length == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Duration::from_secs(u64::from(self.window_length) * unit_secs))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::CapacityTooLarge {
                requested: self.capacity,
                max: Semaphore::MAX_PERMITS,
            });
        }
        let window = self.window()?;
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        if self.sweep_interval_duration() >= window {
            tracing::warn!(
                sweep_interval = ?self.sweep_interval_duration(),
                window = ?window,
                "Sweep interval is not shorter than the window; expired permits will be reclaimed late"
            );
        }
        Ok(())
    }
}
