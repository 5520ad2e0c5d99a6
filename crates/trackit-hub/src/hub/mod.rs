//! Connection hub
//!
//! One coordinating task owns the live connection set. Register, unregister
//! and broadcast requests travel over a single ordered queue and are applied
//! one at a time, so the live set itself needs no lock. A read/write lock only
//! guards the diagnostics directory that mirrors it.

mod error;
mod handle;
mod registry;
mod stats;

pub use error::HubError;
pub use handle::Hub;
pub use stats::HubStatsSnapshot;
