//! # trackit-hub
//!
//! Real-time connection hub for the TrackIt task backend. Authenticated
//! WebSocket clients register with a single coordinating hub, and every event
//! published through the [`broadcast::Broadcaster`] is fanned out to all of
//! them. Slow consumers are evicted instead of slowing anyone else down.

pub mod broadcast;
pub mod connection;
pub mod hub;
pub mod identity;
pub mod protocol;
pub mod pump;
pub mod server;

pub use broadcast::{Broadcaster, EventKind, PublishError};
pub use hub::{Hub, HubError, HubStatsSnapshot};
pub use identity::{IdentityProvider, JwtIdentityProvider};
pub use server::{create_app, create_app_state, run, serve, AppState};
