//! Service wiring: staging area, media host, orchestrator and health sampler.

use crate::services::{HealthMonitor, MovieService};
use crate::state::AppState;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use watchly_core::Config;
use watchly_db::MovieStore;
use watchly_storage::{CloudinaryUploader, MediaHost, StagingArea, StagingLimits};

/// Build every service on top of `store` and start the background health sampler.
pub async fn initialize_services(
    config: &Config,
    store: Arc<dyn MovieStore>,
) -> Result<Arc<AppState>> {
    let staging = setup_staging(config).await?;

    let cloudinary = config.cloudinary();
    if !cloudinary.is_complete() {
        tracing::warn!(
            "Cloudinary credentials are incomplete; uploads will fail until they are configured"
        );
    }
    let media = CloudinaryUploader::new(cloudinary).context("Failed to create Cloudinary client")?;
    tracing::info!(
        api_base = %cloudinary.api_base,
        folder = %cloudinary.folder,
        chunk_size_bytes = cloudinary.chunk_size_bytes,
        "Cloudinary uploader initialized"
    );

    let state = build_state(config.clone(), store, Arc::new(media), staging);

    state
        .health
        .clone()
        .start_monitoring(Duration::from_millis(config.health_interval_ms()));

    Ok(state)
}

/// Resolve the staging directory from the configured preference and the fallbacks.
pub async fn setup_staging(config: &Config) -> Result<Arc<StagingArea>> {
    let candidates = StagingArea::default_candidates(config.upload_dir().map(Path::new));
    let limits = StagingLimits {
        max_file_size: config.max_file_size_bytes(),
        max_files: config.max_files_per_request(),
    };
    let staging = StagingArea::resolve(&candidates, limits)
        .await
        .context("Failed to resolve staging directory")?;
    Ok(Arc::new(staging))
}

/// Assemble application state from already constructed collaborators.
pub fn build_state(
    config: Config,
    store: Arc<dyn MovieStore>,
    media: Arc<dyn MediaHost>,
    staging: Arc<StagingArea>,
) -> Arc<AppState> {
    let health = Arc::new(HealthMonitor::new(
        config.clone(),
        store.clone(),
        staging.dir().to_path_buf(),
    ));
    let movies = MovieService::new(store, media);
    Arc::new(AppState::new(config, movies, health, staging))
}
