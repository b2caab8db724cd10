// Application state
// Shared by every request handler through axum's `State` extractor

use crate::config::Config;
use crate::separation::{DemucsBackend, SeparationBackend};
use crate::services::separator::SeparationService;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main application state
///
/// Cheap to clone; all fields are shared.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Runs separation jobs
    pub separator: Arc<SeparationService>,
}

impl AppState {
    /// Create state that runs the configured Demucs command
    pub fn new(config: Config, shutdown: CancellationToken) -> Self {
        let backend = Arc::new(DemucsBackend::from_config(&config));
        Self::with_backend(config, backend, shutdown)
    }

    /// Create state around a specific separation backend
    ///
    /// Cancelling `shutdown` cancels every running job.
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn SeparationBackend>,
        shutdown: CancellationToken,
    ) -> Self {
        let separator = SeparationService::new(&config, backend, shutdown);
        Self {
            config: Arc::new(config),
            separator: Arc::new(separator),
        }
    }
}
