//! Replica registry and state fan-out.
//!
//! The [`Registry`] hands out replica IDs and relays every published state
//! to all other registered replicas. Its member table is the only state
//! shared between replicas; it is locked for registration and for taking a
//! snapshot of the receivers, never while a merge runs.
//!
//! # Example
//!
//! ```
//! use crdt_relay::prelude::*;
//!
//! let registry = Registry::builder()
//!     .delivery(DeliveryMode::Mailbox)
//!     .build();
//!
//! let replicas: Vec<_> = (0..3).map(|_| registry.register()).collect();
//! for r in &replicas {
//!     r.increment();
//! }
//!
//! registry.flush().unwrap();
//! assert!(replicas.iter().all(|r| r.value() == 3));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};

use crate::crdt::Broadcaster;
use crate::error::RelayError;
use crate::mailbox::Mailbox;
use crate::replica::ReplicaHandle;
use crate::state::{ReplicaId, ReplicaState};

/// How published states reach the other replicas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Merge into each receiver before `broadcast` returns.
    #[default]
    Direct,
    /// Queue into each receiver's mailbox, merged by a worker thread.
    /// Use [`Registry::flush`] to wait for queued states to land.
    Mailbox,
}

/// Configuration for a [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Delivery strategy for published states.
    pub delivery: DeliveryMode,
}

/// Builder for constructing a [`Registry`] with custom configuration.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// Set the delivery strategy.
    pub fn delivery(mut self, delivery: DeliveryMode) -> Self {
        self.config.delivery = delivery;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the `Registry`.
    pub fn build(self) -> Registry {
        Registry::with_config(self.config)
    }
}

/// Owner of the replica set and the ID sequence.
///
/// Cloning a `Registry` yields another handle to the same registry.
/// Replicas keep only a weak reference back, so dropping every `Registry`
/// handle stops fan-out (and mailbox workers) while the replicas stay
/// readable.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

struct Shared {
    config: RegistryConfig,
    members: Mutex<Members>,
}

struct Members {
    next_id: u64,
    replicas: BTreeMap<ReplicaId, Member>,
}

#[derive(Clone)]
struct Member {
    replica: ReplicaHandle,
    mailbox: Option<Mailbox>,
}

impl Shared {
    fn lock_members(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcaster for Shared {
    fn broadcast(&self, sender: ReplicaId, state: &ReplicaState) -> Result<usize, RelayError> {
        let receivers: Vec<Member> = {
            let members = self.lock_members();
            if !members.replicas.contains_key(&sender) {
                warn!("ignoring broadcast from unregistered replica {sender}");
                return Err(RelayError::UnknownSender(sender));
            }
            members
                .replicas
                .iter()
                .filter(|(id, _)| **id != sender)
                .map(|(_, member)| member.clone())
                .collect()
        };

        // Mailboxes all queue the same copy.
        let payload = match self.config.delivery {
            DeliveryMode::Direct => None,
            DeliveryMode::Mailbox => Some(Arc::new(state.clone())),
        };
        for member in &receivers {
            trace!("relaying state of {sender} to {}", member.replica.id());
            match (&member.mailbox, &payload) {
                (Some(mailbox), Some(payload)) => {
                    if let Err(err) = mailbox.post(Arc::clone(payload)) {
                        warn!("dropping delivery: {err}");
                    }
                }
                _ => member.replica.receive_join(state),
            }
        }
        Ok(receivers.len())
    }
}

impl Registry {
    /// Create a registry with the default configuration (direct delivery).
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                members: Mutex::new(Members {
                    next_id: 0,
                    replicas: BTreeMap::new(),
                }),
            }),
        }
    }

    /// Start building a registry with custom configuration.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Create a new replica with the next unused ID.
    ///
    /// IDs start at 0 and are strictly increasing. The new replica starts
    /// from `{id: 0}` and only sees states published after it joined.
    pub fn register(&self) -> ReplicaHandle {
        let broadcaster: Arc<dyn Broadcaster + Send + Sync> = self.shared.clone();
        let mut members = self.shared.lock_members();

        let id = ReplicaId::new(members.next_id);
        members.next_id += 1;

        let replica = ReplicaHandle::new(id, Arc::downgrade(&broadcaster));
        let mailbox = match self.shared.config.delivery {
            DeliveryMode::Direct => None,
            DeliveryMode::Mailbox => Some(Mailbox::spawn(replica.clone())),
        };
        let previous = members.replicas.insert(
            id,
            Member {
                replica: replica.clone(),
                mailbox,
            },
        );
        debug_assert!(previous.is_none(), "replica id {id} allocated twice");
        drop(members);

        debug!("registered replica {id}");
        replica
    }

    /// Deliver `state` to every registered replica except `sender`.
    ///
    /// Replicas registered after the receiver list was taken do not get
    /// this state. Returns the number of receivers.
    pub fn broadcast(&self, sender: ReplicaId, state: &ReplicaState) -> Result<usize, RelayError> {
        self.shared.broadcast(sender, state)
    }

    /// Block until every mailbox has merged all states queued before this
    /// call. Returns immediately with direct delivery.
    pub fn flush(&self) -> Result<(), RelayError> {
        let mailboxes: Vec<Mailbox> = self
            .shared
            .lock_members()
            .replicas
            .values()
            .filter_map(|member| member.mailbox.clone())
            .collect();
        if mailboxes.is_empty() {
            return Ok(());
        }

        let mut pending = Vec::with_capacity(mailboxes.len());
        for mailbox in &mailboxes {
            pending.push((mailbox.owner(), mailbox.request_flush()?));
        }
        for (owner, acked) in pending {
            acked.recv().map_err(|_| RelayError::MailboxClosed(owner))?;
        }
        debug!("flushed {} mailboxes", mailboxes.len());
        Ok(())
    }

    /// Look up a replica by ID.
    pub fn get(&self, id: ReplicaId) -> Option<ReplicaHandle> {
        self.shared
            .lock_members()
            .replicas
            .get(&id)
            .map(|member| member.replica.clone())
    }

    /// All registered replicas in ascending ID order.
    pub fn replicas(&self) -> Vec<ReplicaHandle> {
        self.shared
            .lock_members()
            .replicas
            .values()
            .map(|member| member.replica.clone())
            .collect()
    }

    /// IDs of all registered replicas in ascending order.
    pub fn ids(&self) -> Vec<ReplicaId> {
        self.shared.lock_members().replicas.keys().copied().collect()
    }

    /// Number of registered replicas.
    pub fn len(&self) -> usize {
        self.shared.lock_members().replicas.len()
    }

    /// Returns `true` if no replica has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Broadcaster for Registry {
    fn broadcast(&self, sender: ReplicaId, state: &ReplicaState) -> Result<usize, RelayError> {
        Registry::broadcast(self, sender, state)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
