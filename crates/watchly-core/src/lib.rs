//! Watchly Core Library
//!
//! Domain models, error types and configuration shared by the Watchly crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, CloudinaryConfig, Config, WatchlyConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
