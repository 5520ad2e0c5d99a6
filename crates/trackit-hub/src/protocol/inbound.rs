//! Inbound client messages

use serde_json::Value;

/// Reply enqueued for an application-level ping
pub const PONG_REPLY: &str = r#"{"type":"pong"}"#;

/// What the hub makes of an inbound frame's `type` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// `{"type":"ping"}`: answered with [`PONG_REPLY`]
    Ping,
    /// `{"type":"pong"}`: counts as a keep-alive ack
    Pong,
    /// Any other kind, left to higher-level handling
    Other(String),
    /// Valid JSON without a string `type`
    Untyped,
}

/// A decoded inbound text frame
#[derive(Debug, Clone)]
pub struct InboundMessage {
    value: Value,
}

impl InboundMessage {
    /// Decode a text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(|value| Self { value })
    }

    /// Classify by the `type` field
    #[must_use]
    pub fn kind(&self) -> InboundKind {
        match self.value.get("type").and_then(Value::as_str) {
            Some("ping") => InboundKind::Ping,
            Some("pong") => InboundKind::Pong,
            Some(other) => InboundKind::Other(other.to_string()),
            None => InboundKind::Untyped,
        }
    }
}
