//! Hub server state
//!
//! Shared dependencies handed to every request handler.

use crate::broadcast::Broadcaster;
use crate::hub::Hub;
use crate::identity::IdentityProvider;
use std::sync::Arc;
use trackit_common::AppConfig;

/// Application state
///
/// The hub is owned here and reaches handlers only through this value.
#[derive(Clone)]
pub struct AppState {
    /// Connection hub
    hub: Hub,
    /// Publish facade over the hub
    broadcaster: Broadcaster,
    /// Resolves credentials to user ids
    identity: Arc<dyn IdentityProvider>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new application state
    pub fn new(hub: Hub, identity: Arc<dyn IdentityProvider>, config: AppConfig) -> Self {
        Self {
            broadcaster: Broadcaster::new(hub.clone()),
            hub,
            identity,
            config: Arc::new(config),
        }
    }

    /// Get the hub
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Get the identity provider
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("hub", &self.hub)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}
