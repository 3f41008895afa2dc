use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::Crdt;

/// Identity of a replica.
///
/// IDs are handed out by the [`Registry`](crate::Registry) in ascending
/// order starting at 0 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ReplicaId(u64);

impl ReplicaId {
    /// Wrap a raw replica number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw replica number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ReplicaId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observed increment counts, keyed by replica.
///
/// This is the state of a grow-only counter. Entries never decrease: a
/// replica bumps only its own entry, and every other entry moves only
/// through [`merge_from`](Self::merge_from), which takes the per-entry
/// maximum. A missing entry reads as zero.
///
/// # Example
///
/// ```
/// use crdt_relay::prelude::*;
///
/// let a = ReplicaId::new(0);
/// let b = ReplicaId::new(1);
///
/// let mut left = ReplicaState::with_own(a);
/// left.bump_own(a);
/// left.bump_own(a);
///
/// let mut right = ReplicaState::with_own(b);
/// right.bump_own(b);
///
/// left.merge_from(&right);
/// assert_eq!(left.value(), 3);
/// assert_eq!(left.get(b), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ReplicaState {
    counts: BTreeMap<ReplicaId, u64>,
}

impl ReplicaState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the initial state of replica `own`: `{own: 0}`.
    pub fn with_own(own: ReplicaId) -> Self {
        let mut state = Self::new();
        state.set_own(own);
        state
    }

    /// Make sure an entry for `own` exists. An existing count is kept.
    pub fn set_own(&mut self, own: ReplicaId) {
        self.counts.entry(own).or_insert(0);
    }

    /// Observed count for `id`, or 0 if nothing has been seen from it.
    #[must_use]
    pub fn get(&self, id: ReplicaId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Whether an entry for `id` is present.
    #[must_use]
    pub fn contains(&self, id: ReplicaId) -> bool {
        self.counts.contains_key(&id)
    }

    /// Increment the entry of `own` by exactly 1 and return the new count.
    pub fn bump_own(&mut self, own: ReplicaId) -> u64 {
        self.bump_own_by(own, 1)
    }

    /// Increment the entry of `own` by `n` and return the new count.
    pub fn bump_own_by(&mut self, own: ReplicaId, n: u64) -> u64 {
        let entry = self.counts.entry(own).or_insert(0);
        *entry = entry.saturating_add(n);
        *entry
    }

    /// Join `incoming` into this state by taking the per-entry maximum.
    ///
    /// Entries absent from `incoming` are untouched and a lower incoming
    /// count never lowers a local one. Returns whether any count increased.
    pub fn merge_from(&mut self, incoming: &ReplicaState) -> bool {
        let mut grew = false;
        for (&id, &count) in &incoming.counts {
            match self.counts.entry(id) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(count);
                    grew |= count > 0;
                }
                btree_map::Entry::Occupied(mut slot) => {
                    if count > *slot.get() {
                        slot.insert(count);
                        grew = true;
                    }
                }
            }
        }
        grew
    }

    /// Sum of all observed counts.
    ///
    /// Until the replicas converge this is a lower bound on the number of
    /// increments issued system-wide. Saturates at `u64::MAX`.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// Number of replicas with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no replica has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(replica, count)` in ascending replica order.
    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, u64)> + '_ {
        self.counts.iter().map(|(&id, &count)| (id, count))
    }

    /// Copy the entries out as a plain map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<ReplicaId, u64> {
        self.counts.clone()
    }
}

impl Crdt for ReplicaState {
    fn merge(&mut self, other: &Self) {
        self.merge_from(other);
    }
}

impl From<BTreeMap<ReplicaId, u64>> for ReplicaState {
    fn from(counts: BTreeMap<ReplicaId, u64>) -> Self {
        Self { counts }
    }
}

impl From<ReplicaState> for BTreeMap<ReplicaId, u64> {
    fn from(state: ReplicaState) -> Self {
        state.counts
    }
}

/// Collecting keeps the highest count seen for a repeated replica.
impl FromIterator<(ReplicaId, u64)> for ReplicaState {
    fn from_iter<I: IntoIterator<Item = (ReplicaId, u64)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (id, count) in iter {
            let entry = counts.entry(id).or_insert(0);
            *entry = count.max(*entry);
        }
        Self { counts }
    }
}
