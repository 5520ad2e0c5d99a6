//! Cloneable handle to the hub loop

use super::registry::{Directory, HubRequest, Registry};
use super::stats::{HubStats, HubStatsSnapshot};
use super::HubError;
use crate::connection::{Connection, ConnectionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle to the connection hub
///
/// Every method only enqueues a request for the coordinating loop; none of
/// them waits on a connection. The loop stops on [`Hub::shutdown`] or once all
/// handles are dropped, closing every live mailbox on the way out.
#[derive(Clone)]
pub struct Hub {
    requests: mpsc::UnboundedSender<HubRequest>,
    pending_broadcasts: Arc<AtomicUsize>,
    intake_capacity: usize,
    directory: Directory,
    stats: Arc<HubStats>,
}

impl Hub {
    /// Start the coordinating loop on the current runtime
    ///
    /// `intake_capacity` bounds how many broadcasts may wait in the queue
    /// before [`Hub::broadcast`] starts refusing them.
    pub fn spawn(intake_capacity: usize) -> (Self, JoinHandle<()>) {
        let intake_capacity = intake_capacity.max(1);
        let (requests, receiver) = mpsc::unbounded_channel();
        let pending_broadcasts = Arc::new(AtomicUsize::new(0));
        let directory = Directory::default();
        let stats = Arc::new(HubStats::default());

        let registry = Registry::new(
            receiver,
            pending_broadcasts.clone(),
            directory.clone(),
            stats.clone(),
        );
        let handle = tokio::spawn(registry.run());

        tracing::info!(intake_capacity = intake_capacity, "Hub started");

        (
            Self {
                requests,
                pending_broadcasts,
                intake_capacity,
                directory,
                stats,
            },
            handle,
        )
    }

    /// Add a connection to the live set
    ///
    /// It receives every broadcast the loop processes after this request.
    pub fn register(&self, connection: Arc<Connection>) -> Result<(), HubError> {
        self.requests
            .send(HubRequest::Register(connection))
            .map_err(|_| HubError::Closed)
    }

    /// Remove a connection and close its mailbox; a no-op if it is not live
    ///
    /// Never fails: once the loop has stopped every mailbox is already closed.
    pub fn unregister(&self, id: ConnectionId) {
        if self.requests.send(HubRequest::Unregister(id)).is_err() {
            tracing::trace!(connection_id = %id, "Hub stopped, unregister skipped");
        }
    }

    /// Fan a payload out to every live connection
    pub fn broadcast(&self, payload: impl Into<Arc<str>>) -> Result<(), HubError> {
        let pending = self.pending_broadcasts.fetch_add(1, Ordering::AcqRel);
        if pending >= self.intake_capacity {
            self.pending_broadcasts.fetch_sub(1, Ordering::AcqRel);
            self.stats.record_dropped();
            return Err(HubError::IntakeFull(pending));
        }

        if self
            .requests
            .send(HubRequest::Broadcast(payload.into()))
            .is_err()
        {
            self.pending_broadcasts.fetch_sub(1, Ordering::AcqRel);
            return Err(HubError::Closed);
        }

        Ok(())
    }

    /// Wait until every request sent before this call has been applied
    pub async fn flush(&self) -> Result<(), HubError> {
        let (ack, done) = oneshot::channel();
        self.requests
            .send(HubRequest::Flush(ack))
            .map_err(|_| HubError::Closed)?;
        done.await.map_err(|_| HubError::Closed)
    }

    /// Stop the loop; live mailboxes are closed, which ends their write pumps
    pub fn shutdown(&self) {
        let _ = self.requests.send(HubRequest::Shutdown);
    }

    /// Whether the loop is still accepting requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.directory.read().len()
    }

    /// Distinct users with at least one live connection, sorted
    pub fn connected_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.directory.read().values().cloned().collect();
        users.sort();
        users.dedup();
        users
    }

    /// Check if a connection is live
    pub fn is_live(&self, id: ConnectionId) -> bool {
        self.directory.read().contains_key(&id)
    }

    /// Counter snapshot
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot(self.connection_count())
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("connections", &self.connection_count())
            .field("intake_capacity", &self.intake_capacity)
            .field("running", &self.is_running())
            .finish()
    }
}
