//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared, read-only state for the HTTP handlers. Tracing calls share
/// nothing, so there is no lock here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState {
            config: Arc::new(config),
        }
    }
}
