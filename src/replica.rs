use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, warn};

use crate::crdt::{Broadcaster, Mergeable};
use crate::error::RelayError;
use crate::state::{ReplicaId, ReplicaState};

/// A grow-only counter replica.
///
/// Handles are cheap to clone; all clones refer to the same replica. A
/// replica only ever bumps its own entry and learns about the others from
/// states published through its registry.
///
/// # Example
///
/// ```
/// use crdt_relay::prelude::*;
///
/// let registry = Registry::new();
/// let r0 = registry.register();
/// let r1 = registry.register();
///
/// r0.increment();
/// r1.increment();
/// r1.increment();
///
/// assert_eq!(r0.value(), 3);
/// assert_eq!(r1.value(), 3);
/// ```
#[derive(Clone)]
pub struct ReplicaHandle {
    inner: Arc<Replica>,
}

struct Replica {
    id: ReplicaId,
    state: Mutex<ReplicaState>,
    broadcaster: Weak<dyn Broadcaster + Send + Sync>,
}

impl Replica {
    // A poisoned state is still a valid state: every write is a bump or a max.
    fn lock_state(&self) -> MutexGuard<'_, ReplicaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ReplicaState) -> Result<usize, RelayError> {
        let broadcaster = self
            .broadcaster
            .upgrade()
            .ok_or(RelayError::RegistryGone(self.id))?;
        broadcaster.broadcast(self.id, state)
    }
}

impl ReplicaHandle {
    pub(crate) fn new(id: ReplicaId, broadcaster: Weak<dyn Broadcaster + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(Replica {
                id,
                state: Mutex::new(ReplicaState::with_own(id)),
                broadcaster,
            }),
        }
    }

    /// This replica's ID.
    #[must_use]
    pub fn id(&self) -> ReplicaId {
        self.inner.id
    }

    /// Increment this replica's count by 1 and publish the new state.
    ///
    /// Returns once the state has been handed to every replica the registry
    /// knows about at this point.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Increment this replica's count by `n` and publish the new state.
    ///
    /// `n == 0` changes nothing and publishes nothing.
    pub fn increment_by(&self, n: u64) {
        if n == 0 {
            return;
        }
        let id = self.id();
        // Publish a copy so no replica lock is held while others merge.
        let snapshot = {
            let mut state = self.inner.lock_state();
            let own = state.bump_own_by(id, n);
            debug!("replica {id} incremented by {n}, own count {own}");
            state.clone()
        };
        if let Err(err) = self.inner.publish(&snapshot) {
            warn!("replica {id} could not publish its state: {err}");
        }
    }

    /// Total of all counts this replica has observed.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.inner.lock_state().value()
    }

    /// Count this replica has observed for `id`.
    #[must_use]
    pub fn count_for(&self, id: ReplicaId) -> u64 {
        self.inner.lock_state().get(id)
    }

    /// Merge a state learned from another replica.
    ///
    /// Safe to call with any state, any number of times, in any order.
    pub fn receive_join(&self, incoming: &ReplicaState) {
        let mut state = self.inner.lock_state();
        let before = state.value();
        if state.merge_from(incoming) {
            debug!(
                "replica {} joined state, value {} -> {}",
                self.id(),
                before,
                state.value()
            );
        }
    }

    /// Read-only copy of the current state.
    #[must_use]
    pub fn snapshot_state(&self) -> ReplicaState {
        self.inner.lock_state().clone()
    }

    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Mergeable for ReplicaHandle {
    fn receive_join(&self, state: &ReplicaState) {
        ReplicaHandle::receive_join(self, state);
    }
}

impl fmt::Debug for ReplicaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaHandle")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.lock_state())
            .finish()
    }
}
