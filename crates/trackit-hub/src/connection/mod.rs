//! Connection management
//!
//! A [`Connection`] is one accepted client plus its bounded outbound
//! [`Mailbox`]. Membership is owned by the hub; the transport halves are owned
//! by the two pumps.

mod connection;
mod mailbox;

pub use connection::{Connection, ConnectionId};
pub use mailbox::{EnqueueError, Mailbox, MailboxReceiver};
