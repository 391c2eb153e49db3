use super::{MovieStore, StoreDetails};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use watchly_core::models::{Movie, NewMovie, UpdateMovieRequest};
use watchly_core::AppError;

const MOVIE_COLUMNS: &str = "id, title, description, category, language, quality, \
     thumbnail_url, thumbnail_asset_id, video_url, video_asset_id, \
     format, duration, byte_size, width, height, created_at";

/// PostgreSQL-backed movie repository (`movies` table)
#[derive(Clone)]
pub struct MovieRepository {
    pool: PgPool,
}

impl MovieRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieStore for MovieRepository {
    #[tracing::instrument(skip(self, movie), fields(db.table = "movies", db.operation = "insert"))]
    async fn create(&self, movie: NewMovie) -> Result<Movie, AppError> {
        let query = format!(
            r#"
            INSERT INTO movies (
                title, description, category, language, quality,
                thumbnail_url, thumbnail_asset_id, video_url, video_asset_id,
                format, duration, byte_size, width, height, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            MOVIE_COLUMNS
        );

        let created = sqlx::query_as::<Postgres, Movie>(&query)
            .bind(&movie.metadata.title)
            .bind(&movie.metadata.description)
            .bind(&movie.metadata.category)
            .bind(&movie.metadata.language)
            .bind(&movie.metadata.quality)
            .bind(&movie.thumbnail_url)
            .bind(&movie.thumbnail_asset_id)
            .bind(&movie.video_url)
            .bind(&movie.video_asset_id)
            .bind(&movie.format)
            .bind(movie.duration)
            .bind(movie.byte_size)
            .bind(movie.width)
            .bind(movie.height)
            .bind(movie.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<Movie>, AppError> {
        let query = format!(
            "SELECT {} FROM movies ORDER BY created_at DESC",
            MOVIE_COLUMNS
        );
        let movies = sqlx::query_as::<Postgres, Movie>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(movies)
    }

    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Movie>, AppError> {
        let query = format!("SELECT {} FROM movies WHERE id = $1", MOVIE_COLUMNS);
        let movie = sqlx::query_as::<Postgres, Movie>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movie)
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "movies", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateMovieRequest,
    ) -> Result<Option<Movie>, AppError> {
        // COALESCE keeps the stored value for every field the request left out
        let query = format!(
            r#"
            UPDATE movies
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                language = COALESCE($5, language),
                quality = COALESCE($6, quality)
            WHERE id = $1
            RETURNING {}
            "#,
            MOVIE_COLUMNS
        );

        let movie = sqlx::query_as::<Postgres, Movie>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.category)
            .bind(&changes.language)
            .bind(&changes.quality)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movie)
    }

    #[tracing::instrument(skip(self), fields(db.table = "movies", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn details(&self) -> StoreDetails {
        let options = self.pool.connect_options();
        StoreDetails {
            dialect: "postgres".to_string(),
            host: Some(options.get_host().to_string()),
            port: Some(options.get_port()),
            database: options.get_database().map(str::to_string),
        }
    }
}
