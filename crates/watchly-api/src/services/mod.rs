//! Application services: the upload orchestrator, multipart intake and the health sampler.

pub mod health;
pub mod intake;
pub mod movie;

pub use health::{HealthMonitor, Readiness, SystemInfo};
pub use movie::MovieService;
