//! Application state shared by all requests.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use userlookup_core::ServiceConfig;
use userlookup_ldap::DirectoryClient;

/// Read-only state handed to every request.
///
/// `shutdown` is the root cancellation token; each request derives a child from it.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServiceConfig>,
    directory: Arc<DirectoryClient>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(
        config: Arc<ServiceConfig>,
        directory: DirectoryClient,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            directory: Arc::new(directory),
            shutdown,
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Directory client.
    #[must_use]
    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    /// Root cancellation token, cancelled on shutdown.
    #[must_use]
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}
