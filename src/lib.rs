//! # crdt-relay
//!
//! Grow-only counter replicas kept convergent by an in-process relay.
//!
//! Every replica holds a [`ReplicaState`]: the number of increments it has
//! observed from each replica, its own included. A replica increments only
//! its own entry and then publishes its whole state through the
//! [`Registry`], which hands it to every other replica. Receivers merge by
//! taking the per-entry maximum, so states may arrive late, twice, or out of
//! order and all replicas still converge on the same total.
//!
//! ## Quick Start
//!
//! ```
//! use crdt_relay::prelude::*;
//!
//! let registry = Registry::new();
//! let r0 = registry.register();
//! let r1 = registry.register();
//!
//! r0.increment();
//! r0.increment();
//! r1.increment();
//!
//! assert_eq!(r0.value(), 3);
//! assert_eq!(r1.snapshot_state(), r0.snapshot_state());
//! ```
//!
//! ## Delivery
//!
//! With the default [`DeliveryMode::Direct`] a state is merged into every
//! other replica before `increment` returns. [`DeliveryMode::Mailbox`] gives
//! each replica a queue and a worker thread; [`Registry::flush`] waits for
//! the queues to drain.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.

#![warn(missing_docs)]

mod crdt;
mod error;
mod mailbox;
mod registry;
mod replica;
mod state;

pub mod prelude;

pub use crdt::{Broadcaster, Crdt, Mergeable};
pub use error::RelayError;
pub use registry::{DeliveryMode, Registry, RegistryBuilder, RegistryConfig};
pub use replica::ReplicaHandle;
pub use state::{ReplicaId, ReplicaState};
