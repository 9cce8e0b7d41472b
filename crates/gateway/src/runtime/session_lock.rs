//! Per-session concurrency control.
//!
//! Ensures only one cycle runs per session at a time.  A second submit
//! arriving while a cycle is in flight is rejected, never queued.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use sr_domain::OwnerId;

use super::CycleState;

struct Slot {
    sem: Arc<Semaphore>,
    state: Arc<Mutex<CycleState>>,
}

/// Manages per-session cycle locks.
///
/// Each owner maps to a `Semaphore(1)` plus the state of the cycle that
/// holds it.
pub struct SessionLockMap {
    slots: Mutex<HashMap<OwnerId, Slot>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Take the cycle lock for an owner without waiting.
    ///
    /// The returned guard starts in [`CycleState::Submitting`] and puts the
    /// owner back to `Idle` when dropped.
    pub fn try_acquire(&self, owner: &OwnerId) -> Result<CycleGuard, SessionBusy> {
        // The permit is taken while the map is locked so `prune_idle` can
        // never drop a slot between lookup and acquisition.
        let mut slots = self.slots.lock();
        let slot = slots.entry(owner.clone()).or_insert_with(|| Slot {
            sem: Arc::new(Semaphore::new(1)),
            state: Arc::new(Mutex::new(CycleState::Idle)),
        });
        let permit = slot.sem.clone().try_acquire_owned().map_err(|_| SessionBusy)?;
        let state = slot.state.clone();
        drop(slots);

        *state.lock() = CycleState::Submitting;
        Ok(CycleGuard {
            state,
            _permit: permit,
        })
    }

    /// Current state for an owner; `Idle` for owners never seen.
    pub fn state(&self, owner: &OwnerId) -> CycleState {
        self.slots
            .lock()
            .get(owner)
            .map(|slot| *slot.state.lock())
            .unwrap_or(CycleState::Idle)
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Forget sessions whose lock is not held.
    ///
    /// A slot is kept while any guard still references its semaphore.
    pub fn prune_idle(&self) {
        let mut slots = self.slots.lock();
        slots.retain(|_, slot| {
            slot.sem.available_permits() == 0 || Arc::strong_count(&slot.sem) > 1
        });
    }
}

/// Exclusive hold on one session's cycle.
pub struct CycleGuard {
    state: Arc<Mutex<CycleState>>,
    _permit: OwnedSemaphorePermit,
}

impl CycleGuard {
    pub fn set(&self, next: CycleState) {
        *self.state.lock() = next;
    }

    pub fn state(&self) -> CycleState {
        *self.state.lock()
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        *self.state.lock() = CycleState::Idle;
    }
}

/// Returned when a session already has a cycle in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy: a reply is already in progress")
    }
}

impl std::error::Error for SessionBusy {}
