//! Shared application state.

use std::sync::Arc;

use scribe_jobs::{JobCoordinator, ResultAccess, WorkerHandle};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<JobCoordinator>,
    pub results: Arc<ResultAccess>,
    pub workers: Arc<WorkerHandle>,
    pub config: Arc<ServerConfig>,
}
