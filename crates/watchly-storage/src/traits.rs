//! Remote media host abstraction
//!
//! The orchestrator only talks to [`MediaHost`]; the Cloudinary client is one
//! implementation and tests substitute a recording fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Remote host operation errors
#[derive(Debug, Error)]
pub enum MediaHostError {
    /// The host answered with an error; `message` is its own description, verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Media host is not configured: {0}")]
    NotConfigured(String),

    #[error("Media host request failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected media host response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for MediaHostError {
    fn from(err: reqwest::Error) -> Self {
        MediaHostError::Transport(err.to_string())
    }
}

/// Result type for media host operations
pub type MediaHostResult<T> = Result<T, MediaHostError>;

/// Remote resource family; selects the endpoint on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Video,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-upload instructions for the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Incoming transformation applied before storing (e.g. `c_fill,h_200,w_300`)
    pub transformation: Option<String>,
    /// Renditions the host should derive ahead of time
    pub eager: Vec<String>,
    /// Derive eager renditions in the background
    pub eager_async: bool,
    /// Send the file in sequential byte-range requests
    pub chunked: bool,
}

impl UploadOptions {
    /// Options for a movie thumbnail.
    pub fn thumbnail() -> Self {
        Self {
            transformation: Some("c_fill,h_200,w_300".to_string()),
            ..Default::default()
        }
    }

    /// Options for a movie video: chunked, with two pre-generated renditions.
    pub fn video() -> Self {
        Self {
            transformation: None,
            eager: vec![
                "c_fill,h_720,w_1280".to_string(),
                "c_fill,h_480,w_854".to_string(),
            ],
            eager_async: true,
            chunked: true,
        }
    }
}

/// What the host reports about a stored asset
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAsset {
    pub asset_id: String,
    pub url: String,
    pub format: Option<String>,
    pub duration_seconds: Option<f64>,
    pub byte_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Remote media host
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload a local file and return the stored asset's descriptor.
    async fn upload(
        &self,
        path: &Path,
        kind: ResourceKind,
        options: &UploadOptions,
    ) -> MediaHostResult<RemoteAsset>;

    /// Delete an asset by its identifier.
    async fn delete(&self, asset_id: &str, kind: ResourceKind) -> MediaHostResult<()>;
}
