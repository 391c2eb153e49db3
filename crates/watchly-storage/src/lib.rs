//! Watchly storage
//!
//! Two halves of moving media around:
//! - [`staging`]: the local disk area where multipart uploads land before forwarding
//! - [`traits`] + [`cloudinary`]: the remote media host the staged files are sent to
//!
//! Staged file names follow `<role>-<unix millis>-<random><.ext>` and never leave the
//! staging directory.

pub mod cloudinary;
pub mod staging;
pub mod traits;

pub use cloudinary::CloudinaryUploader;
pub use staging::{release, StagedBatch, StagedFile, StagingArea, StagingError, StagingLimits};
pub use traits::{
    MediaHost, MediaHostError, MediaHostResult, RemoteAsset, ResourceKind, UploadOptions,
};
