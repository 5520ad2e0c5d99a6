//! Publish facade used by request handlers

use crate::hub::{Hub, HubError};
use crate::protocol::Envelope;
use serde::Serialize;

/// Why a publish was not accepted
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("broadcast intake is full ({0} pending)")]
    IntakeFull(usize),

    #[error("hub is not running")]
    HubClosed,
}

impl From<HubError> for PublishError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::IntakeFull(pending) => Self::IntakeFull(pending),
            HubError::Closed => Self::HubClosed,
        }
    }
}

/// Wraps event payloads in the broadcast envelope and hands them to the hub
#[derive(Debug, Clone)]
pub struct Broadcaster {
    hub: Hub,
}

impl Broadcaster {
    #[must_use]
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Publish an event to every live connection
    ///
    /// Never waits on the hub or on any connection.
    pub fn publish<K, T>(&self, kind: K, data: &T) -> Result<(), PublishError>
    where
        K: AsRef<str>,
        T: Serialize + ?Sized,
    {
        let kind = kind.as_ref();
        let payload = Envelope::new(kind, data).to_json()?;

        self.hub.broadcast(payload).map_err(|e| {
            tracing::warn!(kind = %kind, error = %e, "Broadcast dropped");
            PublishError::from(e)
        })?;

        tracing::debug!(kind = %kind, "Broadcast queued");
        Ok(())
    }
}
