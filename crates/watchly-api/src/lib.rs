//! Watchly API Library
//!
//! HTTP handlers, the upload orchestrator, the health sampler and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod error;
pub mod response;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use response::{ApiResponse, MessageResponse};
pub use services::{HealthMonitor, MovieService};
pub use state::AppState;
