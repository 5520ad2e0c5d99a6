//! Inbound half of a connection

use super::PumpConfig;
use crate::connection::{Connection, ConnectionId};
use crate::hub::Hub;
use crate::protocol::{InboundKind, InboundMessage, OutboundMessage, PONG_REPLY};
use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};

/// Why the read pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadExit {
    /// Peer sent a close frame
    Closed,
    /// Transport stream ended without a close frame
    StreamEnded,
    /// Transport returned an error
    TransportError,
    /// Nothing refreshed the read deadline in time
    DeadlineElapsed,
}

/// Requests unregistration when dropped, whichever way the pump exits
struct UnregisterOnDrop {
    hub: Hub,
    id: ConnectionId,
}

impl Drop for UnregisterOnDrop {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Read frames until the transport fails, closes, or goes quiet
///
/// Keep-alive pongs (control frames or `{"type":"pong"}`) push the deadline
/// out by `read_deadline`. On exit the connection is unregistered and the read
/// half is dropped, in that order.
pub async fn read_pump<S, E>(
    connection: Arc<Connection>,
    hub: Hub,
    mut stream: S,
    config: PumpConfig,
) -> ReadExit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let id = connection.id();
    let _unregister = UnregisterOnDrop { hub, id };
    let mut deadline = Instant::now() + config.read_deadline;

    let exit = loop {
        let frame = match timeout_at(deadline, stream.next()).await {
            Err(_) => break ReadExit::DeadlineElapsed,
            Ok(None) => break ReadExit::StreamEnded,
            Ok(Some(Err(e))) => {
                tracing::warn!(connection_id = %id, error = %e, "WebSocket error");
                break ReadExit::TransportError;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                if handle_text(&connection, &text) {
                    deadline = Instant::now() + config.read_deadline;
                }
            }
            Message::Pong(_) => {
                tracing::trace!(connection_id = %id, "Pong received");
                deadline = Instant::now() + config.read_deadline;
            }
            Message::Ping(_) => {
                // Answered by the transport
                tracing::trace!(connection_id = %id, "Ping received");
            }
            Message::Binary(_) => {
                tracing::debug!(connection_id = %id, "Binary frame ignored");
            }
            Message::Close(_) => break ReadExit::Closed,
        }
    };

    tracing::info!(
        connection_id = %id,
        user_id = %connection.user_id(),
        reason = ?exit,
        "Read pump ended"
    );

    exit
}

/// Handle one text frame; returns `true` if it counts as a keep-alive ack
fn handle_text(connection: &Connection, text: &str) -> bool {
    let message = match InboundMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Failed to parse message"
            );
            return false;
        }
    };

    match message.kind() {
        InboundKind::Ping => {
            if let Err(e) = connection.try_enqueue(OutboundMessage::text(PONG_REPLY)) {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Pong reply dropped"
                );
            }
            false
        }
        InboundKind::Pong => true,
        InboundKind::Other(kind) => {
            tracing::debug!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                kind = %kind,
                "Received message"
            );
            false
        }
        InboundKind::Untyped => {
            tracing::debug!(connection_id = %connection.id(), "Message without type ignored");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MailboxReceiver;
    use futures::channel::mpsc::{unbounded, UnboundedSender};
    use std::time::Duration;

    type Inbound = UnboundedSender<Result<Message, String>>;

    fn text(s: &str) -> Result<Message, String> {
        Ok(Message::Text(s.to_string()))
    }

    async fn registered(hub: &Hub, capacity: usize) -> (Arc<Connection>, MailboxReceiver) {
        let (conn, rx) = Connection::new("reader", capacity);
        hub.register(conn.clone()).unwrap();
        hub.flush().await.unwrap();
        (conn, rx)
    }

    fn spawn_pump(
        conn: Arc<Connection>,
        hub: &Hub,
    ) -> (Inbound, tokio::task::JoinHandle<ReadExit>) {
        let (tx, rx) = unbounded();
        let handle = tokio::spawn(read_pump(conn, hub.clone(), rx, PumpConfig::default()));
        (tx, handle)
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, mut mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn.clone(), &hub);

        tx.unbounded_send(text(r#"{"type":"ping"}"#)).unwrap();
        assert_eq!(mailbox.recv().await, Some(OutboundMessage::text(PONG_REPLY)));

        drop(tx);
        assert_eq!(handle.await.unwrap(), ReadExit::StreamEnded);

        hub.flush().await.unwrap();
        assert!(!hub.is_live(conn.id()));
        assert_eq!(mailbox.recv().await, None);
    }

    #[tokio::test]
    async fn test_malformed_frames_are_skipped() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, mut mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn, &hub);

        tx.unbounded_send(text("not json")).unwrap();
        tx.unbounded_send(Ok(Message::Binary(vec![1, 2, 3]))).unwrap();
        tx.unbounded_send(text(r#"{"type":"task.viewed","data":{}}"#)).unwrap();
        tx.unbounded_send(text(r#"{"type":"ping"}"#)).unwrap();

        assert_eq!(mailbox.recv().await, Some(OutboundMessage::text(PONG_REPLY)));
        assert!(!handle.is_finished());
    }

    #[tokio::test]
    async fn test_close_frame_unregisters() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, mut mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn.clone(), &hub);

        tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        assert_eq!(handle.await.unwrap(), ReadExit::Closed);

        hub.flush().await.unwrap();
        assert!(!hub.is_live(conn.id()));
        assert_eq!(mailbox.recv().await, None);
    }

    #[tokio::test]
    async fn test_transport_error_unregisters() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, _mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn.clone(), &hub);

        tx.unbounded_send(Err("connection reset".to_string())).unwrap();
        assert_eq!(handle.await.unwrap(), ReadExit::TransportError);

        hub.flush().await.unwrap();
        assert_eq!(hub.stats().unregistered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_refreshes_deadline() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, _mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn.clone(), &hub);

        tokio::time::sleep(Duration::from_secs(50)).await;
        tx.unbounded_send(Ok(Message::Pong(Vec::new()))).unwrap();

        // 100s after start, 50s after the pong: still alive
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(!handle.is_finished());

        // Past 60s of silence
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(handle.await.unwrap(), ReadExit::DeadlineElapsed);

        hub.flush().await.unwrap();
        assert!(!hub.is_live(conn.id()));
        assert_eq!(hub.stats().unregistered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_application_pong_refreshes_deadline() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, _mailbox) = registered(&hub, 8).await;
        let (tx, handle) = spawn_pump(conn, &hub);

        tokio::time::sleep(Duration::from_secs(45)).await;
        tx.unbounded_send(text(r#"{"type":"pong"}"#)).unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(!handle.is_finished());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.await.unwrap(), ReadExit::DeadlineElapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_ends_pump() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, mut mailbox) = registered(&hub, 8).await;
        let (_tx, handle) = spawn_pump(conn.clone(), &hub);

        assert_eq!(handle.await.unwrap(), ReadExit::DeadlineElapsed);

        hub.flush().await.unwrap();
        assert!(!hub.is_live(conn.id()));
        assert_eq!(mailbox.recv().await, None);
    }

    #[tokio::test]
    async fn test_unregisters_on_panic() {
        let (hub, _loop) = Hub::spawn(16);
        let (conn, _mailbox) = registered(&hub, 8).await;

        let guard_hub = hub.clone();
        let id = conn.id();
        let task = tokio::spawn(async move {
            let _unregister = UnregisterOnDrop { hub: guard_hub, id };
            panic!("handler bug");
        });
        assert!(task.await.unwrap_err().is_panic());

        hub.flush().await.unwrap();
        assert!(!hub.is_live(conn.id()));
    }
}
