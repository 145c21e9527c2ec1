// src/clock.rs

// clock module definition and implementations

// dependencies
use tokio::time::Instant;

/// Clock trait to abstract time retrieval.
/// Implementors must be thread-safe (Send + Sync) and monotonic.
/// The `now` method returns nanoseconds elapsed since a fixed, clock-specific origin.
/// Reservations are stamped with `now` and compared against later `now` readings
/// of the same clock, so the origin itself never matters.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> u64;
}

/// Monotonic clock anchored at its construction instant.
/// Immune to wall-clock adjustments.
/// Built on `tokio::time::Instant`, so it follows tokio's paused clock in tests.
/// This is the default clock used by the WindowLimiter.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        // u64 nanoseconds cover ~584 years of uptime
        self.origin.elapsed().as_nanos() as u64
    }
}
