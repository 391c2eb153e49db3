use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Catalog entry for one uploaded movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Movie {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub thumbnail_url: String,
    pub thumbnail_asset_id: String,
    pub video_url: String,
    pub video_asset_id: String,
    pub format: Option<String>,
    /// Seconds, may be fractional
    pub duration: Option<f64>,
    pub byte_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Free-form text fields sent alongside the upload, copied verbatim into the record.
/// Length limits match the `VARCHAR(255)` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct MovieMetadata {
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 255, message = "Category must be at most 255 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 255, message = "Language must be at most 255 characters"))]
    pub language: Option<String>,
    #[validate(length(max = 255, message = "Quality must be at most 255 characters"))]
    pub quality: Option<String>,
}

impl MovieMetadata {
    /// Assign a multipart text field by name. Returns false for names that are not metadata.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "category" => &mut self.category,
            "language" => &mut self.language,
            "quality" => &mut self.quality,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Insert payload built once both media uploads have succeeded
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub metadata: MovieMetadata,
    pub thumbnail_url: String,
    pub thumbnail_asset_id: String,
    pub video_url: String,
    pub video_asset_id: String,
    pub format: Option<String>,
    pub duration: Option<f64>,
    pub byte_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for a partial movie update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateMovieRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Category must be at most 255 characters"))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Language must be at most 255 characters"))]
    pub language: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Quality must be at most 255 characters"))]
    pub quality: Option<String>,
}

impl UpdateMovieRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.language.is_none()
            && self.quality.is_none()
    }

    /// Merge the provided fields into an existing record.
    pub fn apply_to(&self, movie: &mut Movie) {
        if let Some(title) = &self.title {
            movie.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            movie.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            movie.category = Some(category.clone());
        }
        if let Some(language) = &self.language {
            movie.language = Some(language.clone());
        }
        if let Some(quality) = &self.quality {
            movie.quality = Some(quality.clone());
        }
    }
}
