//! Application state shared by every handler.

use crate::services::{HealthMonitor, MovieService};
use std::sync::Arc;
use watchly_core::Config;
use watchly_storage::StagingArea;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub movies: MovieService,
    pub health: Arc<HealthMonitor>,
    /// Resolved once at startup; every upload request opens a batch here
    pub staging: Arc<StagingArea>,
}

impl AppState {
    pub fn new(
        config: Config,
        movies: MovieService,
        health: Arc<HealthMonitor>,
        staging: Arc<StagingArea>,
    ) -> Self {
        Self {
            config,
            movies,
            health,
            staging,
        }
    }
}
