//! Outbound half of a connection

use super::PumpConfig;
use crate::connection::{ConnectionId, MailboxReceiver};
use crate::protocol::OutboundMessage;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

/// Why the write pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteExit {
    /// The hub closed the mailbox
    MailboxClosed,
    /// A queued message could not be written in time
    WriteFailed,
    /// A keep-alive ping could not be written in time
    PingFailed,
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("write deadline elapsed")]
    Timeout,
    #[error("{0}")]
    Transport(String),
}

/// Drain the mailbox into the transport, interleaving keep-alive pings
///
/// Messages are written in mailbox order. When the mailbox closes a Close frame
/// is attempted, and the transport is closed on every exit path.
pub async fn write_pump<K>(
    connection_id: ConnectionId,
    mut mailbox: MailboxReceiver,
    mut sink: K,
    config: PumpConfig,
) -> WriteExit
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let mut ticker = interval_at(Instant::now() + config.ping_period, config.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            message = mailbox.recv() => {
                let Some(message) = message else {
                    if let Err(e) = write_frame(&mut sink, OutboundMessage::close(), config.write_deadline).await {
                        tracing::trace!(connection_id = %connection_id, error = %e, "Close frame not sent");
                    }
                    break WriteExit::MailboxClosed;
                };

                if let Err(e) = write_frame(&mut sink, message, config.write_deadline).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Write failed");
                    break WriteExit::WriteFailed;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = write_frame(&mut sink, OutboundMessage::ping(), config.write_deadline).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Ping failed");
                    break WriteExit::PingFailed;
                }
            }
        }
    };

    match timeout(config.write_deadline, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::trace!(connection_id = %connection_id, error = %e, "Transport close failed");
        }
        Err(_) => {
            tracing::debug!(connection_id = %connection_id, "Transport close timed out");
        }
    }

    tracing::debug!(connection_id = %connection_id, reason = ?exit, "Write pump ended");

    exit
}

async fn write_frame<K>(
    sink: &mut K,
    message: OutboundMessage,
    deadline: Duration,
) -> Result<(), WriteError>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    match timeout(deadline, sink.send(message.into_frame())).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Transport(e.to_string())),
        Err(_) => Err(WriteError::Timeout),
    }
}
