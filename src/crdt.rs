use crate::error::RelayError;
use crate::state::{ReplicaId, ReplicaState};

/// Core trait for state-based CRDTs.
///
/// A CRDT (Conflict-free Replicated Data Type) guarantees that concurrent
/// updates on different replicas will converge to the same state after merging,
/// without requiring coordination.
///
/// # Properties
///
/// All implementations must satisfy:
/// - **Commutativity:** `a.merge(b) == b.merge(a)`
/// - **Associativity:** `a.merge(b.merge(c)) == a.merge(b).merge(c)`
/// - **Idempotency:** `a.merge(a) == a`
pub trait Crdt {
    /// Merge another replica's state into this one.
    ///
    /// After merging, `self` contains the least upper bound of both states.
    fn merge(&mut self, other: &Self);
}

/// Something that can absorb a state published by another replica.
///
/// Implementors must accept states from any sender, any number of times and
/// in any order. Receiving a state that is already known is a no-op.
pub trait Mergeable {
    /// Join `state` into the receiver's own state.
    fn receive_join(&self, state: &ReplicaState);
}

/// Fan-out of a replica's state to every other known replica.
pub trait Broadcaster {
    /// Deliver `state` to every registered replica except `sender`.
    ///
    /// Returns the number of replicas the state was handed to. An
    /// unregistered `sender` yields [`RelayError::UnknownSender`] and
    /// delivers nothing.
    fn broadcast(&self, sender: ReplicaId, state: &ReplicaState) -> Result<usize, RelayError>;
}
