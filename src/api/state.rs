//! Application state for the API server

use crate::{Config, JobManager};
use crate::system::SystemMonitor;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap - the manager is Arc-backed internally).
#[derive(Clone)]
pub struct AppState {
    /// The job manager
    pub manager: JobManager,

    /// Configuration (read access for handlers)
    pub config: Arc<Config>,

    /// Host metrics sampler for the status endpoint
    pub monitor: Arc<SystemMonitor>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: JobManager, config: Arc<Config>) -> Self {
        Self {
            manager,
            config,
            monitor: Arc::new(SystemMonitor::new()),
        }
    }
}
