//! Event broadcasting
//!
//! Turns domain events into envelopes and fans them out through the hub.

mod event_types;
mod publisher;

pub use event_types::EventKind;
pub use publisher::{Broadcaster, PublishError};
