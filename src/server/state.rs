//! Shared application state for the HTTP server.

use std::sync::Arc;

use crate::config::Config;
use crate::hub::Hub;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Vote registries, connection set and dispatcher queue.
    pub hub: Hub,

    /// Configuration the server was started with.
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new app state around an already started hub.
    pub fn new(hub: Hub, config: Config) -> Self {
        Self {
            hub,
            config: Arc::new(config),
        }
    }
}
