//! Application state for the API server

use crate::{Config, RunRegistry, ThreadDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the downloader, the run registry and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Downloader executing the runs
    pub downloader: ThreadDownloader,

    /// Runs started through this server
    pub registry: RunRegistry,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState sharing the downloader's configuration
    pub fn new(downloader: ThreadDownloader, registry: RunRegistry) -> Self {
        let config = downloader.config();
        Self {
            downloader,
            registry,
            config,
        }
    }
}
