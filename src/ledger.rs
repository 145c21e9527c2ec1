// src/ledger.rs

// reservation ledger: the live set of outstanding reservations

// dependencies
use crate::errors::WindowLimiterError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;

/// Opaque token identifying one outstanding permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(uuid::Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Concurrent map from reservation id to its acquisition time in clock nanos.
///
/// Removal is the single point of truth for "this permit has not been returned
/// yet": whoever gets `true` out of [`try_remove`](Self::try_remove) owns the
/// permit and must hand it back to the pool, everyone else backs off.
#[derive(Debug, Default)]
pub(crate) struct ReservationLedger {
    entries: DashMap<ReservationId, u64>,
}

impl ReservationLedger {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub(crate) fn record(&self, id: ReservationId, acquired_at: u64) -> Result<(), WindowLimiterError> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => {
                tracing::error!(reservation = %id, "Reservation recorded twice");
                Err(WindowLimiterError::DuplicateReservation(id))
            }
            Entry::Vacant(slot) => {
                slot.insert(acquired_at);
                Ok(())
            }
        }
    }

    pub(crate) fn try_remove(&self, id: &ReservationId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Ids whose `acquired_at + window` is strictly before `now`.
    ///
    /// Only shard read locks are held, one shard at a time, and nothing is
    /// removed here. Entries added or removed concurrently may or may not
    /// show up; callers resolve that through `try_remove`.
    pub(crate) fn snapshot_expired(&self, now: u64, window_nanos: u64) -> Vec<ReservationId> {
        self.entries
            .iter()
            .filter(|entry| entry.value().saturating_add(window_nanos) < now)
            .map(|entry| *entry.key())
            .collect()
    }

    pub(crate) fn contains(&self, id: &ReservationId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
