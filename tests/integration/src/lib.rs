//! Integration test utilities for the TrackIt hub
//!
//! Spawns a real hub server on an ephemeral port and talks to it over HTTP and
//! WebSocket.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
