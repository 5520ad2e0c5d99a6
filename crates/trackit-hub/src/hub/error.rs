//! Hub error types

use thiserror::Error;

/// Errors returned by [`Hub`](super::Hub) requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The coordinating loop has stopped
    #[error("hub is not running")]
    Closed,

    /// Too many broadcasts are already waiting in the queue
    #[error("broadcast intake is full ({0} pending)")]
    IntakeFull(usize),
}
