use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Status of one check or of the whole report.
///
/// Variants are ordered by severity so that `max` yields the worst status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
}

impl HealthStatus {
    /// Worst-of aggregation: unhealthy dominates warning dominates healthy.
    /// An empty set of statuses is healthy.
    pub fn worst<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or(HealthStatus::Healthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Outcome of a single health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckResult {
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: message.into(),
            details: None,
            error: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Warning,
            message: message.into(),
            details: None,
            error: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
            details: None,
            error: Some(error.into()),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Aggregate snapshot of all checks at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// Process uptime in seconds
    pub uptime: f64,
    pub version: String,
    pub checks: BTreeMap<String, CheckResult>,
}

impl HealthReport {
    pub fn from_checks(
        checks: BTreeMap<String, CheckResult>,
        uptime: f64,
        version: impl Into<String>,
    ) -> Self {
        let status = HealthStatus::worst(checks.values().map(|c| c.status));
        Self {
            status,
            timestamp: Utc::now(),
            uptime,
            version: version.into(),
            checks,
        }
    }

    /// Report used before the first sample has been taken.
    pub fn initial(version: impl Into<String>) -> Self {
        Self::from_checks(BTreeMap::new(), 0.0, version)
    }

    /// Healthy and warning both serve traffic; only unhealthy does not.
    pub fn is_serving(&self) -> bool {
        self.status != HealthStatus::Unhealthy
    }

    pub fn check_status(&self, name: &str) -> Option<HealthStatus> {
        self.checks.get(name).map(|c| c.status)
    }
}
