//! Movie record store abstraction and its implementations.

mod memory;
mod movie;

pub use memory::InMemoryMovieStore;
pub use movie::MovieRepository;

use async_trait::async_trait;
use uuid::Uuid;
use watchly_core::models::{Movie, NewMovie, UpdateMovieRequest};
use watchly_core::AppError;

/// Connection facts reported by the health endpoints. Never contains credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDetails {
    pub dialect: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

/// Persistence for catalog records keyed by an opaque store-assigned id.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Insert a record; the store assigns the id.
    async fn create(&self, movie: NewMovie) -> Result<Movie, AppError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<Movie>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Movie>, AppError>;

    /// Merge the provided fields. Returns `None` when no record matches.
    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateMovieRequest,
    ) -> Result<Option<Movie>, AppError>;

    /// Returns `true` when a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Lightweight connectivity probe.
    async fn ping(&self) -> Result<(), AppError>;

    fn details(&self) -> StoreDetails;
}
