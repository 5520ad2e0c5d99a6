//! Outbound mailbox messages

use axum::extract::ws::Message;
use std::sync::Arc;

/// Control frames the write side can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame {
    Ping,
    Close,
}

/// A message waiting in a connection's mailbox
///
/// Text payloads are reference counted so a broadcast fanned out to many
/// mailboxes shares one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Application payload (JSON text)
    Text(Arc<str>),
    /// Transport-level control frame
    Control(ControlFrame),
}

impl OutboundMessage {
    #[must_use]
    pub fn text(payload: impl Into<Arc<str>>) -> Self {
        Self::Text(payload.into())
    }

    #[must_use]
    pub fn ping() -> Self {
        Self::Control(ControlFrame::Ping)
    }

    #[must_use]
    pub fn close() -> Self {
        Self::Control(ControlFrame::Close)
    }

    /// The text payload, if this is an application message
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Control(_) => None,
        }
    }

    /// Convert into a WebSocket frame
    #[must_use]
    pub fn into_frame(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text.to_string()),
            Self::Control(ControlFrame::Ping) => Message::Ping(Vec::new()),
            Self::Control(ControlFrame::Close) => Message::Close(None),
        }
    }
}
