//! Per-replica inbound queues.
//!
//! With [`DeliveryMode::Mailbox`](crate::DeliveryMode::Mailbox) every replica
//! owns an unbounded channel drained by its own worker thread, so a
//! publishing replica never runs another replica's merge on its own stack.
//! The channel is FIFO, which is what [`Mailbox::request_flush`] relies on.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::trace;

use crate::error::RelayError;
use crate::replica::ReplicaHandle;
use crate::state::{ReplicaId, ReplicaState};

enum Envelope {
    Join(Arc<ReplicaState>),
    Flush(Sender<()>),
}

/// Sending half of a replica's mailbox.
#[derive(Clone)]
pub(crate) struct Mailbox {
    owner: ReplicaId,
    to_worker: Sender<Envelope>,
}

impl Mailbox {
    /// Start the worker for `replica`. It exits once every `Mailbox` clone
    /// has been dropped.
    pub(crate) fn spawn(replica: ReplicaHandle) -> Self {
        Self::spawn_worker(replica).0
    }

    fn spawn_worker(replica: ReplicaHandle) -> (Self, JoinHandle<()>) {
        let owner = replica.id();
        let (to_worker, inbox) = mpsc::channel();
        let worker = thread::spawn(move || drain(replica, inbox));
        (Self { owner, to_worker }, worker)
    }

    /// Queue a state for merging. Receivers of one broadcast share `state`.
    pub(crate) fn post(&self, state: Arc<ReplicaState>) -> Result<(), RelayError> {
        self.to_worker
            .send(Envelope::Join(state))
            .map_err(|_| RelayError::MailboxClosed(self.owner))?;
        trace!("queued state for replica {}", self.owner);
        Ok(())
    }

    /// Queue a marker behind everything posted so far. The returned receiver
    /// yields once the worker has reached it.
    pub(crate) fn request_flush(&self) -> Result<Receiver<()>, RelayError> {
        let (ack, acked) = mpsc::channel();
        self.to_worker
            .send(Envelope::Flush(ack))
            .map_err(|_| RelayError::MailboxClosed(self.owner))?;
        Ok(acked)
    }

    pub(crate) fn owner(&self) -> ReplicaId {
        self.owner
    }
}

fn drain(replica: ReplicaHandle, inbox: Receiver<Envelope>) {
    for envelope in inbox {
        match envelope {
            Envelope::Join(state) => replica.receive_join(&state),
            // The flusher may have given up waiting; nothing to do then.
            Envelope::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    trace!("mailbox of replica {} closed", replica.id());
}
