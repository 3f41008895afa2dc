//! Convenient re-exports for common usage.
//!
//! ```
//! use crdt_relay::prelude::*;
//! ```

pub use crate::Broadcaster;
pub use crate::Crdt;
pub use crate::DeliveryMode;
pub use crate::Mergeable;
pub use crate::Registry;
pub use crate::ReplicaHandle;
pub use crate::ReplicaId;
pub use crate::ReplicaState;
