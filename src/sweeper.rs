// src/sweeper.rs

// expiry sweeper: background reclaim of reservations older than the window

// dependencies
use crate::ledger::ReservationLedger;
use crate::pool::PermitPool;
use crate::errors::WindowLimiterError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Reclaim every reservation older than the window. Returns how many permits went back.
///
/// Each expired id goes through `try_remove` on its own; an id that vanished
/// since the snapshot was released explicitly in the meantime and is skipped.
pub(crate) fn sweep_expired(
    ledger: &ReservationLedger,
    pool: &PermitPool,
    now: u64,
    window_nanos: u64,
) -> usize {
    let mut reclaimed = 0;
    for id in ledger.snapshot_expired(now, window_nanos) {
        if ledger.try_remove(&id) {
            pool.release();
            reclaimed += 1;
            tracing::debug!(reservation = %id, "Reservation expired; permit reclaimed");
        } else {
            tracing::trace!(reservation = %id, "Reservation released before it could be swept");
        }
    }
    reclaimed
}

/// Handle to the periodic sweep task.
///
/// The task stops when [`stop`](Self::stop) is called or the handle is dropped.
#[derive(Debug)]
pub(crate) struct Sweeper {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _stop_on_drop: DropGuard,
}

impl Sweeper {
    /// Spawn `sweep` on the current tokio runtime, once per `period`.
    pub(crate) fn start<F>(period: Duration, sweep: F) -> Result<Self, WindowLimiterError>
    where
        F: Fn() -> usize + Send + 'static,
    {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| WindowLimiterError::SweeperUnavailable)?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let reclaimed = sweep();
                        if reclaimed > 0 {
                            tracing::debug!(reclaimed, "Sweep tick reclaimed expired permits");
                        }
                    }
                }
            }
            tracing::debug!("Expiry sweeper stopped");
        });

        Ok(Self {
            _stop_on_drop: cancel.clone().drop_guard(),
            cancel,
            task,
        })
    }

    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
