use core::fmt;

use crate::state::ReplicaId;

/// Error type for relay operations.
///
/// Merging and incrementing cannot fail. These variants only describe
/// problems on the delivery path between replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A broadcast was tagged with a sender the registry does not know.
    UnknownSender(ReplicaId),
    /// The replica outlived the registry it was created by.
    RegistryGone(ReplicaId),
    /// The mailbox worker for this replica is no longer running.
    MailboxClosed(ReplicaId),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSender(id) => write!(f, "broadcast from unknown sender {id}"),
            Self::RegistryGone(id) => write!(f, "registry dropped before replica {id} could publish"),
            Self::MailboxClosed(id) => write!(f, "mailbox of replica {id} is closed"),
        }
    }
}

impl std::error::Error for RelayError {}
