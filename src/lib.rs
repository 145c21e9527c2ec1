// src/lib.rs

//! # Window Limiter
//!
//! An admission gate that bounds how many operations may be in flight within a
//! rolling time window, e.g. to stay under a downstream API's quota of N calls
//! per minute.
//!
//! Each admitted operation holds a permit. The permit comes back when the caller
//! releases it or, at the latest, once it is older than the window: a background
//! sweeper reclaims reservations nobody released. Either way a permit is returned
//! exactly once.
//!
//! ## Quick Example
//!
//! ```rust
//! use window_limiter::{TimeUnit, WindowLimiter, WindowLimiterConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), window_limiter::WindowLimiterError> {
//! let config = WindowLimiterConfig::new(10, TimeUnit::Minutes);
//! let limiter = WindowLimiter::new(config)?;
//!
//! let reservation = limiter.acquire().await?;
//! // ... call the rate-limited API ...
//! limiter.release(reservation);
//!
//! // or let a guard release on every exit path
//! let answer = limiter.run(async { 42 }).await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

// private modules
mod clock;
mod config;
mod errors;
mod ledger;
mod pool;
mod sweeper;
mod window_limiter;

// public API exports
pub use clock::{Clock, MonotonicClock};
pub use config::{TimeUnit, WindowLimiterConfig};
pub use errors::{ConfigError, WindowLimiterError};
pub use ledger::ReservationId;
pub use window_limiter::{ReservationGuard, WindowLimiter};
pub use tokio_util::sync::CancellationToken;
