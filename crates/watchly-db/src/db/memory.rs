use super::{MovieStore, StoreDetails};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use watchly_core::models::{Movie, NewMovie, UpdateMovieRequest};
use watchly_core::AppError;

/// Process-local store for running the service without a database and for tests.
#[derive(Default)]
pub struct InMemoryMovieStore {
    movies: RwLock<HashMap<Uuid, Movie>>,
    unavailable: RwLock<Option<String>>,
}

impl InMemoryMovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with the given reason until cleared.
    pub async fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.write().await = reason.map(str::to_string);
    }

    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.movies.read().await.is_empty()
    }

    async fn ensure_available(&self) -> Result<(), AppError> {
        match self.unavailable.read().await.as_deref() {
            Some(reason) => Err(AppError::Internal(format!(
                "Record store unavailable: {}",
                reason
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn create(&self, movie: NewMovie) -> Result<Movie, AppError> {
        self.ensure_available().await?;

        let record = Movie {
            id: Uuid::new_v4(),
            title: movie.metadata.title,
            description: movie.metadata.description,
            category: movie.metadata.category,
            language: movie.metadata.language,
            quality: movie.metadata.quality,
            thumbnail_url: movie.thumbnail_url,
            thumbnail_asset_id: movie.thumbnail_asset_id,
            video_url: movie.video_url,
            video_asset_id: movie.video_asset_id,
            format: movie.format,
            duration: movie.duration,
            byte_size: movie.byte_size,
            width: movie.width,
            height: movie.height,
            created_at: movie.created_at,
        };
        self.movies.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<Movie>, AppError> {
        self.ensure_available().await?;

        let mut movies: Vec<Movie> = self.movies.read().await.values().cloned().collect();
        movies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movies)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Movie>, AppError> {
        self.ensure_available().await?;
        Ok(self.movies.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateMovieRequest,
    ) -> Result<Option<Movie>, AppError> {
        self.ensure_available().await?;

        let mut movies = self.movies.write().await;
        Ok(movies.get_mut(&id).map(|movie| {
            changes.apply_to(movie);
            movie.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.ensure_available().await?;
        Ok(self.movies.write().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.ensure_available().await
    }

    fn details(&self) -> StoreDetails {
        StoreDetails {
            dialect: "memory".to_string(),
            host: None,
            port: None,
            database: None,
        }
    }
}
