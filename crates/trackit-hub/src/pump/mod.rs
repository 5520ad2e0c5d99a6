//! Connection pumps
//!
//! Every live connection runs two tasks. The read pump owns the inbound half
//! of the transport and ends on transport error, close or missed deadline. The
//! write pump owns the outbound half and ends when its mailbox is closed or a
//! write fails. The two never share flags: the read side reaches the write side
//! only through the hub (unregister, then mailbox close). When the write side
//! ends first, [`run_connection`] drops the read side, which unregisters.

mod read;
mod write;

pub use read::{read_pump, ReadExit};
pub use write::{write_pump, WriteExit};

use crate::connection::Connection;
use crate::hub::{Hub, HubError};
use axum::extract::ws::Message;
use futures::{Sink, Stream};
use std::fmt::Display;
use std::time::Duration;
use trackit_common::HubConfig;

/// Timing shared by both pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Silence tolerated on the read side before it gives up
    pub read_deadline: Duration,
    /// Time allowed for a single frame write
    pub write_deadline: Duration,
    /// Interval between keep-alive pings; must stay below `read_deadline`
    pub ping_period: Duration,
}

impl From<&HubConfig> for PumpConfig {
    fn from(config: &HubConfig) -> Self {
        Self {
            read_deadline: config.read_deadline(),
            write_deadline: config.write_deadline(),
            ping_period: config.ping_period(),
        }
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

/// Which pump ended a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionExit {
    /// Read side ended; the write side finishes once the hub closes the mailbox
    Read(ReadExit),
    /// Write side ended; the read side was dropped and the connection unregistered
    Write(WriteExit),
}

/// Bind an authenticated transport to the hub and run it to completion
///
/// Registers the connection, spawns the write pump and drives the read pump on
/// the calling task. Returns as soon as either side ends. If the write side
/// goes first the read pump is dropped, so the inbound half is released and
/// the connection leaves the live set.
pub async fn run_connection<S, K, E>(
    hub: Hub,
    user_id: String,
    stream: S,
    sink: K,
    mailbox_capacity: usize,
    config: PumpConfig,
) -> Result<ConnectionExit, HubError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    K: Sink<Message> + Unpin + Send + 'static,
    K::Error: Display + Send,
{
    let (connection, mailbox) = Connection::new(user_id, mailbox_capacity);
    hub.register(connection.clone())?;

    tracing::info!(
        connection_id = %connection.id(),
        user_id = %connection.user_id(),
        "WebSocket connection established"
    );

    let id = connection.id();
    let mut writer = tokio::spawn(write_pump(id, mailbox, sink, config));

    let exit = tokio::select! {
        exit = read_pump(connection, hub, stream, config) => ConnectionExit::Read(exit),
        joined = &mut writer => {
            let exit = joined.unwrap_or_else(|e| {
                tracing::error!(connection_id = %id, error = %e, "Write pump aborted");
                WriteExit::WriteFailed
            });
            tracing::info!(
                connection_id = %id,
                reason = ?exit,
                "Write side ended, closing connection"
            );
            ConnectionExit::Write(exit)
        }
    };

    Ok(exit)
}
