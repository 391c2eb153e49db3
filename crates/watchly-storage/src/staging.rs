//! Local staging area for incoming upload payloads.
//!
//! A [`StagingArea`] owns the resolved directory and the per-request limits. Each request
//! opens a [`StagedBatch`], which streams multipart file fields to disk and owns the
//! resulting [`StagedFile`]s until they are released. Dropping a batch that still holds
//! files removes them synchronously, so an abandoned request leaves nothing behind.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rand::Rng;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use watchly_core::models::FileRole;
use watchly_core::AppError;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;
const MAX_EXTENSION_LEN: usize = 10;
const CREATE_ATTEMPTS: usize = 3;

/// Staging failures. Client-caused variants render as 400s.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Unexpected field name")]
    UnexpectedField(String),

    #[error("Too many files. Maximum {max} files allowed.")]
    TooManyFiles { max: usize },

    #[error("Only one {0} file is allowed")]
    DuplicateField(FileRole),

    #[error("{}", .0.invalid_type_message())]
    InvalidFileType(FileRole),

    #[error("File too large. Maximum size is {limit}.")]
    PayloadTooLarge { limit: String },

    #[error("Failed to read upload stream: {0}")]
    Stream(String),

    #[error("No writable staging directory (tried: {0})")]
    NoWritableDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StagingResult<T> = Result<T, StagingError>;

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        let message = err.to_string();
        match err {
            StagingError::UnexpectedField(_)
            | StagingError::DuplicateField(_)
            | StagingError::Stream(_) => AppError::Validation(message),
            StagingError::TooManyFiles { .. } => AppError::TooManyFiles(message),
            StagingError::InvalidFileType(_) => AppError::InvalidFileType(message),
            StagingError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(message),
            StagingError::NoWritableDirectory(_) | StagingError::Io(_) => {
                AppError::Internal(message)
            }
        }
    }
}

/// Per-request upload limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingLimits {
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for StagingLimits {
    fn default() -> Self {
        Self {
            max_file_size: 2 * GIB,
            max_files: 2,
        }
    }
}

/// A payload written to the staging directory for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub role: FileRole,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Resolved staging directory plus limits; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    limits: StagingLimits,
}

impl StagingArea {
    /// Try each candidate directory in order; the first one that can be created and
    /// written to wins. Every rejected candidate is logged.
    pub async fn resolve(candidates: &[PathBuf], limits: StagingLimits) -> StagingResult<Self> {
        let mut tried = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match probe_dir(candidate).await {
                Ok(()) => {
                    tracing::info!(
                        path = %candidate.display(),
                        max_file_size = limits.max_file_size,
                        max_files = limits.max_files,
                        "Staging directory resolved"
                    );
                    return Ok(Self {
                        dir: candidate.clone(),
                        limits,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Staging directory candidate unusable, trying next"
                    );
                    tried.push(candidate.display().to_string());
                }
            }
        }

        Err(StagingError::NoWritableDirectory(tried.join(", ")))
    }

    /// Candidate order: configured directory, `uploads` next to the executable,
    /// `uploads` under the working directory, then the system temp directory.
    pub fn default_candidates(preferred: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(dir) = preferred {
            candidates.push(dir.to_path_buf());
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir.join("uploads"));
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join("uploads"));
        }
        candidates.push(std::env::temp_dir().join("watchly-uploads"));

        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open a batch for one request.
    pub fn begin(&self) -> StagedBatch {
        StagedBatch {
            dir: self.dir.clone(),
            limits: self.limits,
            files: Vec::new(),
        }
    }
}

/// Files staged for one request. Owns them until [`StagedBatch::release_all`] or drop.
#[derive(Debug)]
pub struct StagedBatch {
    dir: PathBuf,
    limits: StagingLimits,
    files: Vec<StagedFile>,
}

impl StagedBatch {
    /// Stream one multipart file field to disk.
    ///
    /// Limits and the content-type allow-list are checked before any byte is written;
    /// the size limit is enforced while streaming and a partial file is removed.
    pub async fn stage<S, E>(
        &mut self,
        field_name: &str,
        file_name: Option<&str>,
        content_type: Option<&str>,
        mut body: S,
    ) -> StagingResult<&StagedFile>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        if self.files.len() >= self.limits.max_files {
            return Err(StagingError::TooManyFiles {
                max: self.limits.max_files,
            });
        }

        let role = FileRole::from_field_name(field_name)
            .ok_or_else(|| StagingError::UnexpectedField(field_name.to_string()))?;

        if self.files.iter().any(|f| f.role == role) {
            return Err(StagingError::DuplicateField(role));
        }

        let content_type = content_type.unwrap_or("application/octet-stream");
        if !role.accepts(content_type) {
            return Err(StagingError::InvalidFileType(role));
        }

        let original_name = file_name.unwrap_or_default().to_string();
        fs::create_dir_all(&self.dir).await?;
        let (path, mut file) = create_unique(&self.dir, role, &original_name).await?;

        let start = std::time::Instant::now();
        let mut size: u64 = 0;
        let written: StagingResult<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| StagingError::Stream(e.to_string()))?;
                size += chunk.len() as u64;
                if size > self.limits.max_file_size {
                    return Err(StagingError::PayloadTooLarge {
                        limit: format_size(self.limits.max_file_size),
                    });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = written {
            remove_quietly(&path).await;
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            role = %role,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged upload"
        );

        self.files.push(StagedFile {
            path,
            role,
            original_name,
            content_type: content_type.to_string(),
            size,
        });
        Ok(&self.files[self.files.len() - 1])
    }

    /// Staged file for a role, if one was received and is non-empty.
    pub fn get(&self, role: FileRole) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.role == role && f.size > 0)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Remove every staged file. Never fails; problems are logged.
    pub async fn release_all(&mut self) {
        for file in self.files.drain(..) {
            release(&file).await;
        }
    }
}

impl Drop for StagedBatch {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            match std::fs::remove_file(&file.path) {
                Ok(()) => {
                    tracing::info!(path = %file.path.display(), "Cleaned up abandoned staged file")
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Failed to clean up abandoned staged file"
                ),
            }
        }
    }
}

/// Delete a staged file if present. Errors are logged, never raised.
pub async fn release(file: &StagedFile) {
    match fs::remove_file(&file.path).await {
        Ok(()) => tracing::info!(path = %file.path.display(), "Cleaned up staged file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %file.path.display(),
            error = %e,
            "Failed to clean up staged file"
        ),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

async fn probe_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let probe = dir.join(format!(".write-probe-{}", uuid::Uuid::new_v4()));
    fs::write(&probe, b"").await?;
    fs::remove_file(&probe).await
}

/// `create_new` guarantees an existing file is never overwritten; a collision retries
/// with a fresh random component.
async fn create_unique(
    dir: &Path,
    role: FileRole,
    original_name: &str,
) -> StagingResult<(PathBuf, fs::File)> {
    let mut last_err = None;
    for _ in 0..CREATE_ATTEMPTS {
        let path = dir.join(staged_file_name(role, original_name));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(e.into()),
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "name collision"))
        .into())
}

fn staged_file_name(role: FileRole, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{}-{}-{}{}",
        role.as_str(),
        millis,
        random,
        sanitized_extension(original_name)
    )
}

/// Original extension with a leading dot, restricted to ASCII alphanumerics.
fn sanitized_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

fn format_size(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
