//! Health check handlers and response types.

use crate::services::SystemInfo;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use watchly_core::models::{CheckResult, HealthReport, HealthStatus};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `true` only when every check is healthy
    pub success: bool,
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<BTreeMap<String, CheckResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl HealthResponse {
    fn summary(report: &HealthReport) -> Self {
        let healthy = report.status == HealthStatus::Healthy;
        Self {
            success: healthy,
            status: report.status,
            message: if healthy {
                "Server is healthy"
            } else {
                "Server has issues"
            }
            .to_string(),
            timestamp: report.timestamp,
            uptime: report.uptime,
            version: report.version.clone(),
            checks: None,
            system: None,
            cached: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub success: bool,
    /// `ready` or `not ready`
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub critical_checks: BTreeMap<String, HealthStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessResponse {
    pub success: bool,
    pub status: String,
    pub message: String,
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

/// 200 while serving (healthy or warning), 503 when unhealthy.
fn status_code(report: &HealthReport) -> StatusCode {
    if report.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Healthy or degraded", body = HealthResponse),
        (status = 503, description = "Unhealthy", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let report = state.health.check_now().await;
    (status_code(&report), Json(HealthResponse::summary(&report)))
}

#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses(
        (status = 200, description = "Every check plus host information", body = HealthResponse),
        (status = 503, description = "Unhealthy", body = HealthResponse)
    )
)]
pub async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (report, system) = state.health.detailed().await;
    let mut body = HealthResponse::summary(&report);
    body.checks = Some(report.checks.clone());
    body.system = Some(system);
    (status_code(&report), Json(body))
}

#[utoipa::path(
    get,
    path = "/health/cached",
    tag = "health",
    responses(
        (status = 200, description = "Last sampled report", body = HealthResponse),
        (status = 503, description = "Last sample was unhealthy", body = HealthResponse)
    )
)]
pub async fn cached_health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let report = state.health.cached_status().await;
    let mut body = HealthResponse::summary(&report);
    body.cached = Some(true);
    (status_code(&report), Json(body))
}

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "health",
    responses((status = 200, description = "pong", body = PingResponse))
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        success: true,
        message: "pong".to_string(),
        timestamp: Utc::now(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Database and environment are healthy", body = ReadinessResponse),
        (status = 503, description = "A critical check failed", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let readiness = state.health.readiness().await;
    let (code, status, message) = if readiness.ready {
        (StatusCode::OK, "ready", "Service is ready")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready",
            "Service is not ready",
        )
    };

    (
        code,
        Json(ReadinessResponse {
            success: readiness.ready,
            status: status.to_string(),
            message: message.to_string(),
            timestamp: readiness.timestamp,
            critical_checks: readiness.critical_checks,
        }),
    )
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = LivenessResponse))
)]
pub async fn liveness_check(State(state): State<Arc<AppState>>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        success: true,
        status: "alive".to_string(),
        message: "Process is alive".to_string(),
        uptime: state.health.uptime(),
        timestamp: Utc::now(),
    })
}
