//! Bounded per-connection outbound queue
//!
//! The sending half lives in a single slot. Closing the mailbox empties the
//! slot, which drops the only sender and lets the write pump observe the
//! closed channel after draining what is already queued.

use crate::protocol::OutboundMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Receiving half, drained by the connection's write pump
pub type MailboxReceiver = mpsc::Receiver<OutboundMessage>;

/// Why a non-blocking enqueue failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// No free slot: the consumer is not keeping up
    #[error("mailbox is full")]
    Full,
    /// Closed by the hub, or the write pump is gone
    #[error("mailbox is closed")]
    Closed,
}

/// Bounded outbound mailbox
pub struct Mailbox {
    sender: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
    capacity: usize,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` messages (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> (Self, MailboxReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                sender: Mutex::new(Some(tx)),
                capacity,
            },
            rx,
        )
    }

    /// Enqueue without waiting
    pub fn try_enqueue(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        let slot = self.sender.lock();
        let Some(sender) = slot.as_ref() else {
            return Err(EnqueueError::Closed);
        };

        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Close the mailbox. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    /// Whether the mailbox can no longer accept messages
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .is_none_or(mpsc::Sender::is_closed)
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
