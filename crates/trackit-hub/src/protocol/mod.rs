//! Wire protocol
//!
//! The hub speaks a minimal JSON text protocol: outbound broadcasts are wrapped
//! in an [`Envelope`], and the only inbound message with server-side meaning is
//! the application-level `{"type":"ping"}`.

mod envelope;
mod inbound;
mod outbound;

pub use envelope::Envelope;
pub use inbound::{InboundKind, InboundMessage, PONG_REPLY};
pub use outbound::{ControlFrame, OutboundMessage};
