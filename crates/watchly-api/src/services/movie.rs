//! Upload orchestration and catalog operations.
//!
//! `create_movie` forwards the staged thumbnail and video to the media host, then
//! writes the record. Remote assets that end up without a record are deleted on a
//! best-effort basis; staged files are released on every path.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
use watchly_core::models::{FileRole, Movie, MovieMetadata, NewMovie, UpdateMovieRequest};
use watchly_core::AppError;
use watchly_db::MovieStore;
use watchly_storage::{MediaHost, RemoteAsset, ResourceKind, StagedBatch, UploadOptions};

#[derive(Clone)]
pub struct MovieService {
    store: Arc<dyn MovieStore>,
    media: Arc<dyn MediaHost>,
}

impl MovieService {
    pub fn new(store: Arc<dyn MovieStore>, media: Arc<dyn MediaHost>) -> Self {
        Self { store, media }
    }

    /// Publish a staged upload as a new catalog record. The batch is always released.
    #[tracing::instrument(
        skip(self, metadata, batch),
        fields(db.table = "movies", db.operation = "insert", title = ?metadata.title)
    )]
    pub async fn create_movie(
        &self,
        metadata: MovieMetadata,
        mut batch: StagedBatch,
    ) -> Result<Movie, AppError> {
        let result = self.publish(metadata, &batch).await;
        batch.release_all().await;
        result
    }

    async fn publish(&self, metadata: MovieMetadata, batch: &StagedBatch) -> Result<Movie, AppError> {
        let (thumbnail, video) = match (batch.get(FileRole::Thumbnail), batch.get(FileRole::Video)) {
            (Some(thumbnail), Some(video)) => (thumbnail, video),
            _ => {
                return Err(AppError::Validation(
                    "Both video and thumbnail files are required".to_string(),
                ))
            }
        };
        metadata.validate()?;

        let thumbnail_asset = self
            .media
            .upload(&thumbnail.path, ResourceKind::Image, &UploadOptions::thumbnail())
            .await
            .map_err(|e| AppError::RemoteUpload(format!("Thumbnail upload failed: {}", e)))?;

        let video_asset = match self
            .media
            .upload(&video.path, ResourceKind::Video, &UploadOptions::video())
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                discard_asset(
                    self.media.as_ref(),
                    &thumbnail_asset.asset_id,
                    ResourceKind::Image,
                )
                .await;
                return Err(AppError::RemoteUpload(format!("Video upload failed: {}", e)));
            }
        };

        let record = new_movie(metadata, &thumbnail_asset, &video_asset);
        match self.store.create(record).await {
            Ok(movie) => {
                tracing::info!(
                    movie_id = %movie.id,
                    video_asset_id = %movie.video_asset_id,
                    thumbnail_asset_id = %movie.thumbnail_asset_id,
                    byte_size = movie.byte_size,
                    "Movie uploaded"
                );
                Ok(movie)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    video_asset_id = %video_asset.asset_id,
                    thumbnail_asset_id = %thumbnail_asset.asset_id,
                    "Failed to save movie record, deleting uploaded assets"
                );
                let media = self.media.clone();
                let orphans = [
                    (thumbnail_asset.asset_id, ResourceKind::Image),
                    (video_asset.asset_id, ResourceKind::Video),
                ];
                tokio::spawn(async move {
                    for (asset_id, kind) in &orphans {
                        discard_asset(media.as_ref(), asset_id, *kind).await;
                    }
                });
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "select"))]
    pub async fn list_movies(&self) -> Result<Vec<Movie>, AppError> {
        self.store.list().await
    }

    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "select"))]
    pub async fn get_movie(&self, id: Uuid) -> Result<Movie, AppError> {
        self.store.get(id).await?.ok_or_else(not_found)
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "movies", db.operation = "update"))]
    pub async fn update_movie(
        &self,
        id: Uuid,
        changes: &UpdateMovieRequest,
    ) -> Result<Movie, AppError> {
        if changes.is_empty() {
            return self.get_movie(id).await;
        }
        self.store.update(id, changes).await?.ok_or_else(not_found)
    }

    /// Delete both remote assets (failures are logged) and then the record.
    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "delete"))]
    pub async fn delete_movie(&self, id: Uuid) -> Result<(), AppError> {
        let movie = self.store.get(id).await?.ok_or_else(not_found)?;

        discard_asset(
            self.media.as_ref(),
            &movie.thumbnail_asset_id,
            ResourceKind::Image,
        )
        .await;
        discard_asset(self.media.as_ref(), &movie.video_asset_id, ResourceKind::Video).await;

        if !self.store.delete(id).await? {
            return Err(not_found());
        }

        tracing::info!(movie_id = %id, "Movie deleted");
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Movie not found".to_string())
}

fn new_movie(metadata: MovieMetadata, thumbnail: &RemoteAsset, video: &RemoteAsset) -> NewMovie {
    NewMovie {
        metadata,
        thumbnail_url: thumbnail.url.clone(),
        thumbnail_asset_id: thumbnail.asset_id.clone(),
        video_url: video.url.clone(),
        video_asset_id: video.asset_id.clone(),
        format: video.format.clone(),
        duration: video.duration_seconds,
        byte_size: video.byte_size,
        width: video.width,
        height: video.height,
        created_at: video.created_at,
    }
}

async fn discard_asset(media: &dyn MediaHost, asset_id: &str, kind: ResourceKind) {
    match media.delete(asset_id, kind).await {
        Ok(()) => tracing::info!(asset_id = %asset_id, kind = %kind, "Remote asset deleted"),
        Err(e) => tracing::warn!(
            asset_id = %asset_id,
            kind = %kind,
            error = %e,
            "Failed to delete remote asset"
        ),
    }
}
