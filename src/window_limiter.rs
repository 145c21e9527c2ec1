// src/window_limiter.rs

// window-limiter: bounds in-flight operations per rolling time window.

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::config::WindowLimiterConfig;
use crate::errors::WindowLimiterError;
use crate::ledger::{ReservationId, ReservationLedger};
use crate::pool::PermitPool;
use crate::sweeper::{Sweeper, sweep_expired};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// State shared between callers, guards and the sweeper task.
#[derive(Debug)]
struct Shared<C> {
    ledger: ReservationLedger,
    pool: PermitPool,
    clock: C,
    window: Duration,
    window_nanos: u64,
}

impl<C: Clock> Shared<C> {
    // called right after the pool handed out a permit, with no await in between
    fn record_new(&self) -> Result<ReservationId, WindowLimiterError> {
        let id = ReservationId::new();
        if let Err(err) = self.ledger.record(id, self.clock.now()) {
            self.pool.release();
            return Err(err);
        }
        tracing::trace!(reservation = %id, "Permit acquired");
        Ok(id)
    }

    fn release(&self, id: &ReservationId) -> bool {
        if self.ledger.try_remove(id) {
            self.pool.release();
            tracing::trace!(reservation = %id, "Permit released");
            true
        } else {
            false
        }
    }

    fn sweep(&self) -> usize {
        sweep_expired(&self.ledger, &self.pool, self.clock.now(), self.window_nanos)
    }
}

/// The main WindowLimiter model.
/// At most `capacity` reservations are outstanding at once; each one lasts
/// until it is released or until it is older than the window, whichever
/// comes first.
/// C is the clock type, defaulting to MonotonicClock.
/// Dropping the limiter stops its background sweeper.
#[derive(Debug)]
pub struct WindowLimiter<C = MonotonicClock>
where
    C: Clock,
{
    shared: Arc<Shared<C>>,
    sweeper: Sweeper,
}

impl WindowLimiter<MonotonicClock> {
    /// Create a limiter on the monotonic clock. Must be called inside a tokio runtime.
    pub fn new(config: WindowLimiterConfig) -> Result<Self, WindowLimiterError> {
        Self::with_config(config, MonotonicClock::new())
    }
}

// methods for the WindowLimiter type
impl<C> WindowLimiter<C>
where
    C: Clock,
{
    // method to create a new window limiter from a config object and a clock
    pub fn with_config(config: WindowLimiterConfig, clock: C) -> Result<Self, WindowLimiterError> {
        config.validate()?;
        let window = config.window()?;
        let shared = Arc::new(Shared {
            ledger: ReservationLedger::new(),
            pool: PermitPool::new(config.capacity),
            clock,
            window,
            window_nanos: window.as_nanos().min(u64::MAX as u128) as u64,
        });

        let sweeper = {
            let shared = Arc::clone(&shared);
            Sweeper::start(config.sweep_interval_duration(), move || shared.sweep())?
        };

        tracing::info!(
            capacity = config.capacity,
            window = ?window,
            sweep_interval = ?config.sweep_interval_duration(),
            "Window limiter started"
        );

        Ok(Self { shared, sweeper })
    }

    /// Wait until a permit is free and reserve it.
    ///
    /// Dropping the returned future before it resolves leaves the limiter untouched.
    pub async fn acquire(&self) -> Result<ReservationId, WindowLimiterError> {
        self.shared.pool.acquire().await?;
        self.shared.record_new()
    }

    /// Like [`acquire`](Self::acquire), but gives up with `Cancelled` once `cancel` fires.
    pub async fn acquire_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ReservationId, WindowLimiterError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Acquire cancelled while waiting for a permit");
                Err(WindowLimiterError::Cancelled)
            }
            acquired = self.shared.pool.acquire() => {
                acquired?;
                self.shared.record_new()
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up with `TimedOut` after `timeout`.
    pub async fn acquire_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ReservationId, WindowLimiterError> {
        tokio::time::timeout(timeout, self.shared.pool.acquire())
            .await
            .map_err(|_| WindowLimiterError::TimedOut(timeout))??;
        self.shared.record_new()
    }

    /// Reserve a permit only if one is free right now.
    pub fn try_acquire(&self) -> Result<Option<ReservationId>, WindowLimiterError> {
        if self.shared.pool.try_acquire()? {
            self.shared.record_new().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Give the permit behind `id` back.
    ///
    /// Returns true if this call returned the permit, false if the reservation
    /// was already released or reclaimed by the sweeper. Safe to call repeatedly.
    pub fn release(&self, id: ReservationId) -> bool {
        self.shared.release(&id)
    }

    /// Acquire a permit held by a guard that releases it when dropped.
    pub async fn acquire_guard(&self) -> Result<ReservationGuard<C>, WindowLimiterError> {
        let id = self.acquire().await?;
        Ok(ReservationGuard {
            shared: Arc::clone(&self.shared),
            id,
            armed: true,
        })
    }

    /// Run `work` while holding a permit; the permit is released however `work` ends,
    /// including when this future is dropped midway.
    pub async fn run<F, T>(&self, work: F) -> Result<T, WindowLimiterError>
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire_guard().await?;
        Ok(work.await)
    }

    /// Reclaim expired reservations now instead of waiting for the next tick.
    pub fn sweep_now(&self) -> usize {
        self.shared.sweep()
    }

    /// Stop the sweeper and fail current and future waiters with `Closed`.
    pub fn shutdown(&self) {
        if !self.shared.pool.is_closed() {
            tracing::info!(
                outstanding = self.shared.pool.outstanding(),
                "Window limiter shutting down"
            );
        }
        self.sweeper.stop();
        self.shared.pool.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.pool.is_closed()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    pub fn is_reserved(&self, id: ReservationId) -> bool {
        self.shared.ledger.contains(&id)
    }

    pub fn capacity(&self) -> usize {
        self.shared.pool.capacity()
    }

    pub fn window(&self) -> Duration {
        self.shared.window
    }

    pub fn available_permits(&self) -> usize {
        self.shared.pool.available()
    }

    /// Number of reservations currently in the ledger
    pub fn outstanding(&self) -> usize {
        self.shared.ledger.len()
    }
}

/// A reservation that is released when the guard goes out of scope.
#[must_use = "dropping the guard releases the permit immediately"]
#[derive(Debug)]
pub struct ReservationGuard<C = MonotonicClock>
where
    C: Clock,
{
    shared: Arc<Shared<C>>,
    id: ReservationId,
    armed: bool,
}

impl<C: Clock> ReservationGuard<C> {
    pub fn id(&self) -> ReservationId {
        self.id
    }

    /// Release now. Returns false if the sweeper already reclaimed the permit.
    pub fn release(mut self) -> bool {
        self.armed = false;
        self.shared.release(&self.id)
    }

    /// Detach the reservation from the guard. It must then be released
    /// through [`WindowLimiter::release`] or left to expire.
    pub fn into_id(mut self) -> ReservationId {
        self.armed = false;
        self.id
    }
}

impl<C: Clock> Drop for ReservationGuard<C> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.release(&self.id);
        }
    }
}
