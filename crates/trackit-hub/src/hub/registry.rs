//! The hub's coordinating loop
//!
//! `Registry` is the only code that touches the live set. It runs as one task
//! and never awaits anything but the next request.

use super::stats::HubStats;
use crate::connection::{Connection, ConnectionId, EnqueueError};
use crate::protocol::OutboundMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Connection id to user id, mirrored from the live set for diagnostics
pub(super) type Directory = Arc<RwLock<HashMap<ConnectionId, String>>>;

/// Requests accepted by the loop, applied strictly in arrival order
pub(super) enum HubRequest {
    Register(Arc<Connection>),
    Unregister(ConnectionId),
    Broadcast(Arc<str>),
    /// Answered once every earlier request has been applied
    Flush(oneshot::Sender<()>),
    Shutdown,
}

pub(super) struct Registry {
    requests: mpsc::UnboundedReceiver<HubRequest>,
    members: HashMap<ConnectionId, Arc<Connection>>,
    pending_broadcasts: Arc<AtomicUsize>,
    directory: Directory,
    stats: Arc<HubStats>,
}

impl Registry {
    pub(super) fn new(
        requests: mpsc::UnboundedReceiver<HubRequest>,
        pending_broadcasts: Arc<AtomicUsize>,
        directory: Directory,
        stats: Arc<HubStats>,
    ) -> Self {
        Self {
            requests,
            members: HashMap::new(),
            pending_broadcasts,
            directory,
            stats,
        }
    }

    /// Run until shutdown is requested or every [`Hub`](super::Hub) handle is gone
    pub(super) async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request {
                HubRequest::Register(connection) => self.register(connection),
                HubRequest::Unregister(id) => self.unregister(id),
                HubRequest::Broadcast(payload) => {
                    self.pending_broadcasts.fetch_sub(1, Ordering::AcqRel);
                    self.broadcast(&payload);
                }
                HubRequest::Flush(ack) => {
                    let _ = ack.send(());
                }
                HubRequest::Shutdown => {
                    tracing::info!("Hub shutdown requested");
                    self.drain_after_shutdown();
                    break;
                }
            }
        }

        self.close_all();
    }

    /// Settle requests that were queued behind `Shutdown`
    ///
    /// Closing the receiver first means nothing new can be accepted, so every
    /// connection whose registration already returned `Ok` gets its mailbox
    /// closed here.
    fn drain_after_shutdown(&mut self) {
        self.requests.close();

        while let Ok(request) = self.requests.try_recv() {
            match request {
                HubRequest::Register(connection) => {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        "Registration arrived after shutdown, closing"
                    );
                    connection.close_mailbox();
                }
                HubRequest::Broadcast(_) => {
                    self.pending_broadcasts.fetch_sub(1, Ordering::AcqRel);
                }
                HubRequest::Flush(ack) => {
                    let _ = ack.send(());
                }
                HubRequest::Unregister(_) | HubRequest::Shutdown => {}
            }
        }
    }

    fn register(&mut self, connection: Arc<Connection>) {
        let id = connection.id();
        if self.members.contains_key(&id) {
            tracing::debug!(connection_id = %id, "Connection already registered");
            return;
        }

        self.directory
            .write()
            .insert(id, connection.user_id().to_string());

        tracing::info!(
            connection_id = %id,
            user_id = %connection.user_id(),
            live = self.members.len() + 1,
            "Client registered"
        );

        self.members.insert(id, connection);
        self.stats.record_registered();
    }

    fn unregister(&mut self, id: ConnectionId) {
        // Membership decides whether the mailbox still needs closing
        let Some(connection) = self.members.remove(&id) else {
            tracing::trace!(connection_id = %id, "Unregister for connection that is not live");
            return;
        };

        self.directory.write().remove(&id);
        connection.close_mailbox();
        self.stats.record_unregistered();

        tracing::info!(
            connection_id = %id,
            user_id = %connection.user_id(),
            live = self.members.len(),
            "Client unregistered"
        );
    }

    fn broadcast(&mut self, payload: &Arc<str>) {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, connection) in &self.members {
            match connection.try_enqueue(OutboundMessage::Text(Arc::clone(payload))) {
                Ok(()) => delivered += 1,
                Err(EnqueueError::Full) => {
                    tracing::warn!(
                        connection_id = %id,
                        user_id = %connection.user_id(),
                        "Mailbox full, evicting slow consumer"
                    );
                    dead.push(*id);
                }
                Err(EnqueueError::Closed) => {
                    tracing::debug!(connection_id = %id, "Mailbox closed, evicting");
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut directory = self.directory.write();
            for id in &dead {
                if let Some(connection) = self.members.remove(id) {
                    connection.close_mailbox();
                    directory.remove(id);
                }
            }
        }

        self.stats.record_evicted(dead.len());
        self.stats.record_broadcast(delivered);

        tracing::trace!(
            delivered = delivered,
            evicted = dead.len(),
            live = self.members.len(),
            "Broadcast fanned out"
        );
    }

    fn close_all(&mut self) {
        let count = self.members.len();
        for (_, connection) in self.members.drain() {
            connection.close_mailbox();
        }
        self.directory.write().clear();

        tracing::info!(closed = count, "Hub stopped");
    }
}
