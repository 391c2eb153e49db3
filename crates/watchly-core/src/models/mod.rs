//! Data models for the application
//!
//! Catalog records, upload intake types and health reports.

mod health;
mod movie;
mod upload;

pub use health::*;
pub use movie::*;
pub use upload::*;
