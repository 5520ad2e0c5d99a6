//! Individual client connection
//!
//! Identity plus outbound mailbox. The transport itself is not stored here:
//! after the split, the read half belongs to the read pump and the write half
//! to the write pump.

use super::mailbox::{EnqueueError, Mailbox, MailboxReceiver};
use crate::protocol::OutboundMessage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Key of a connection in the hub's live set
pub type ConnectionId = Uuid;

/// A single accepted client connection
pub struct Connection {
    /// Unique per accepted transport
    id: ConnectionId,

    /// Identity supplied by the authentication collaborator
    user_id: String,

    /// Bounded outbound queue
    mailbox: Mailbox,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a connection for an authenticated user
    ///
    /// Returns the shared connection and the mailbox receiver for its write pump.
    pub fn new(user_id: impl Into<String>, mailbox_capacity: usize) -> (Arc<Self>, MailboxReceiver) {
        let (mailbox, receiver) = Mailbox::new(mailbox_capacity);
        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            mailbox,
            created_at: Instant::now(),
        });
        (connection, receiver)
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the user ID
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Try to enqueue a message (non-blocking)
    pub fn try_enqueue(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        self.mailbox.try_enqueue(message)
    }

    /// Close the mailbox; only the hub loop calls this
    pub(crate) fn close_mailbox(&self) -> bool {
        self.mailbox.close()
    }

    /// Check if the mailbox is closed
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("mailbox", &self.mailbox)
            .field("age", &self.age())
            .finish()
    }
}
