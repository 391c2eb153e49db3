//! Health sampler.
//!
//! [`HealthMonitor`] runs the individual checks, keeps the latest [`HealthReport`] in a
//! shared cache and refreshes it from a single background task. Readers never block
//! the sampler for longer than a clone of the report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use utoipa::ToSchema;
use watchly_core::models::{CheckResult, HealthReport, HealthStatus};
use watchly_core::Config;
use watchly_db::MovieStore;

/// Version reported by the health endpoints
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Checks that decide readiness
pub const CRITICAL_CHECKS: [&str; 2] = ["database", "environment"];

const MB: u64 = 1024 * 1024;

/// Host facts attached to the detailed report
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemInfo {
    pub version: String,
    pub os: String,
    pub arch: String,
    pub pid: u32,
    pub process_memory_mb: u64,
    pub system_total_memory_mb: u64,
    pub system_used_memory_mb: u64,
}

/// Outcome of a readiness probe
#[derive(Debug, Clone)]
pub struct Readiness {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
    pub critical_checks: BTreeMap<String, HealthStatus>,
}

pub struct HealthMonitor {
    config: Config,
    store: Arc<dyn MovieStore>,
    staging_dir: PathBuf,
    started: Instant,
    cache: Arc<RwLock<HealthReport>>,
}

impl HealthMonitor {
    pub fn new(config: Config, store: Arc<dyn MovieStore>, staging_dir: PathBuf) -> Self {
        Self {
            config,
            store,
            staging_dir,
            started: Instant::now(),
            cache: Arc::new(RwLock::new(HealthReport::initial(VERSION))),
        }
    }

    /// Seconds since the monitor was created
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Run every check now and replace the cached report.
    #[tracing::instrument(skip(self))]
    pub async fn check_now(&self) -> HealthReport {
        let (database, disk_space) = tokio::join!(self.check_database(), self.check_disk_space());

        let mut checks = BTreeMap::new();
        checks.insert("database".to_string(), database);
        checks.insert("cloudinary".to_string(), self.check_cloudinary());
        checks.insert("disk_space".to_string(), disk_space);
        checks.insert("memory".to_string(), self.check_memory());
        checks.insert("environment".to_string(), self.check_environment());

        let report = HealthReport::from_checks(checks, self.uptime(), VERSION);

        let previous = {
            let mut cache = self.cache.write().await;
            std::mem::replace(&mut *cache, report.clone()).status
        };
        if previous != report.status {
            tracing::info!(
                from = previous.as_str(),
                to = report.status.as_str(),
                "Health status changed"
            );
        }
        if report.status == HealthStatus::Unhealthy {
            let failing: Vec<&str> = report
                .checks
                .iter()
                .filter(|(_, c)| c.status == HealthStatus::Unhealthy)
                .map(|(name, _)| name.as_str())
                .collect();
            tracing::warn!(failing = ?failing, "Health check reports unhealthy");
        }

        report
    }

    /// Last stored report; never runs a check.
    pub async fn cached_status(&self) -> HealthReport {
        self.cache.read().await.clone()
    }

    /// Spawn the background sampler. The first sample is taken immediately.
    pub fn start_monitoring(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tracing::info!(
            interval_ms = period.as_millis() as u64,
            "Health monitoring started"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let report = self.check_now().await;
                tracing::debug!(status = report.status.as_str(), "Health sample taken");
            }
        })
    }

    /// Fresh check restricted to the critical checks.
    pub async fn readiness(&self) -> Readiness {
        let report = self.check_now().await;
        let critical_checks: BTreeMap<String, HealthStatus> = CRITICAL_CHECKS
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    report
                        .check_status(name)
                        .unwrap_or(HealthStatus::Unhealthy),
                )
            })
            .collect();
        let ready = critical_checks
            .values()
            .all(|status| *status == HealthStatus::Healthy);

        Readiness {
            ready,
            timestamp: report.timestamp,
            critical_checks,
        }
    }

    /// Fresh report plus host information.
    pub async fn detailed(&self) -> (HealthReport, SystemInfo) {
        let report = self.check_now().await;
        (report, system_info())
    }

    async fn check_database(&self) -> CheckResult {
        let timeout = Duration::from_secs(self.config.health_check_timeout_secs());
        match run_check(timeout, self.store.ping()).await {
            Ok(()) => {
                let details = self.store.details();
                CheckResult::healthy("Database connection successful").with_details(json!({
                    "dialect": details.dialect,
                    "host": details.host,
                    "port": details.port,
                    "database": details.database,
                }))
            }
            Err(e) => CheckResult::unhealthy("Database connection failed", e),
        }
    }

    fn check_cloudinary(&self) -> CheckResult {
        let cloudinary = self.config.cloudinary();
        if !cloudinary.is_complete() {
            return CheckResult::unhealthy(
                "Cloudinary configuration incomplete",
                "Missing required Cloudinary credentials",
            );
        }

        CheckResult::healthy("Cloudinary configuration valid").with_details(json!({
            "cloud_name": cloudinary.cloud_name,
            "api_key": mask_secret(cloudinary.api_key.as_deref()),
            "api_secret": mask_secret(cloudinary.api_secret.as_deref()),
            "folder": cloudinary.folder,
        }))
    }

    async fn check_disk_space(&self) -> CheckResult {
        let dir = &self.staging_dir;
        match inspect_dir(dir).await {
            Ok(Some((files_count, last_modified))) => {
                let mut details = json!({
                    "uploads_directory": dir.display().to_string(),
                    "files_count": files_count,
                    "last_modified": last_modified,
                });
                if let Some(available) = available_space(dir) {
                    details["available_mb"] = json!(available / MB);
                }
                CheckResult::healthy("Disk space check successful").with_details(details)
            }
            Ok(None) => CheckResult::warning("Uploads directory does not exist").with_details(
                json!({
                    "path": dir.display().to_string(),
                    "suggestion": "Directory will be created automatically on first upload",
                }),
            ),
            Err(e) => CheckResult::unhealthy("Disk space check failed", e.to_string()),
        }
    }

    fn check_memory(&self) -> CheckResult {
        let threshold_mb = self.config.memory_warning_threshold_mb();
        let sample = sample_memory();
        let rss_mb = sample.process_bytes / MB;
        let details = json!({
            "rss_mb": rss_mb,
            "threshold_mb": threshold_mb,
            "system_total_mb": sample.total_bytes / MB,
            "system_used_mb": sample.used_bytes / MB,
        });

        if exceeds_threshold(rss_mb, threshold_mb) {
            CheckResult::warning("High memory usage detected").with_details(details)
        } else {
            CheckResult::healthy("Memory usage normal").with_details(details)
        }
    }

    fn check_environment(&self) -> CheckResult {
        let missing = self.config.missing_required_settings();
        if !missing.is_empty() {
            return CheckResult::unhealthy(
                "Missing required environment variables",
                format!("Missing: {}", missing.join(", ")),
            );
        }

        CheckResult::healthy("All required environment variables are set").with_details(json!({
            "port": self.config.server_port(),
            "environment": self.config.environment(),
            "database_url": "Set",
            "cloudinary_cloud_name": "Set",
        }))
    }
}

/// Await a probe with a timeout, flattening both failure modes into a message.
async fn run_check<F, E>(timeout: Duration, f: F) -> Result<(), String>
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("Timed out after {}s", timeout.as_secs())),
    }
}

/// Only usage strictly above the threshold warns.
fn exceeds_threshold(rss_mb: u64, threshold_mb: u64) -> bool {
    rss_mb > threshold_mb
}

/// `***` followed by the last four characters.
fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(v) => {
            let chars: Vec<char> = v.chars().collect();
            let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
            format!("***{}", tail)
        }
        None => "not set".to_string(),
    }
}

/// `None` when the directory does not exist.
async fn inspect_dir(dir: &Path) -> io::Result<Option<(usize, DateTime<Utc>)>> {
    let metadata = match tokio::fs::metadata(dir).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }

    let last_modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(Some((count, last_modified)))
}

/// Free bytes on the disk holding `dir`, using the longest matching mount point.
fn available_space(dir: &Path) -> Option<u64> {
    let dir = dir.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|disk| dir.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

struct MemorySample {
    process_bytes: u64,
    total_bytes: u64,
    used_bytes: u64,
}

fn sample_memory() -> MemorySample {
    let mut system = System::new();
    system.refresh_memory();
    let process_bytes = match sysinfo::get_current_pid() {
        Ok(pid) => {
            system.refresh_process(pid);
            system.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    };

    MemorySample {
        process_bytes,
        total_bytes: system.total_memory(),
        used_bytes: system.used_memory(),
    }
}

fn system_info() -> SystemInfo {
    let memory = sample_memory();
    SystemInfo {
        version: VERSION.to_string(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        pid: std::process::id(),
        process_memory_mb: memory.process_bytes / MB,
        system_total_memory_mb: memory.total_bytes / MB,
        system_used_memory_mb: memory.used_bytes / MB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use watchly_core::{BaseConfig, CloudinaryConfig, WatchlyConfig};
    use watchly_db::InMemoryMovieStore;

    fn config(complete: bool, memory_warning_threshold_mb: u64) -> Config {
        Config(Box::new(WatchlyConfig {
            base: BaseConfig {
                server_port: 5000,
                cors_origins: vec![],
                db_max_connections: 1,
                db_timeout_seconds: 1,
                environment: "test".to_string(),
            },
            database_url: "postgres://localhost/watchly".to_string(),
            cloudinary: CloudinaryConfig {
                cloud_name: Some("demo".to_string()),
                api_key: complete.then(|| "123456789".to_string()),
                api_secret: complete.then(|| "abcdefgh".to_string()),
                api_base: "http://localhost".to_string(),
                folder: "watchly".to_string(),
                chunk_size_bytes: 20 * MB,
                timeout_secs: 5,
            },
            upload_dir: None,
            max_file_size_bytes: 1024,
            max_files_per_request: 2,
            health_interval_ms: 1000,
            health_check_timeout_secs: 1,
            memory_warning_threshold_mb,
        }))
    }

    #[tokio::test]
    async fn test_all_checks_healthy() {
        let dir = tempdir().unwrap();
        let monitor = HealthMonitor::new(
            config(true, u64::MAX),
            Arc::new(InMemoryMovieStore::new()),
            dir.path().to_path_buf(),
        );

        let report = monitor.check_now().await;

        assert_eq!(report.status, HealthStatus::Healthy, "{:?}", report.checks);
        assert_eq!(report.checks.len(), 5);
        let cloudinary = &report.checks["cloudinary"];
        assert_eq!(cloudinary.details.as_ref().unwrap()["api_key"], "***6789");
        assert_eq!(
            report.checks["disk_space"].details.as_ref().unwrap()["files_count"],
            0
        );
        assert!(monitor.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_missing_directory_is_warning() {
        let dir = tempdir().unwrap();
        let monitor = HealthMonitor::new(
            config(true, u64::MAX),
            Arc::new(InMemoryMovieStore::new()),
            dir.path().join("absent"),
        );

        let report = monitor.check_now().await;

        assert_eq!(report.status, HealthStatus::Warning);
        assert_eq!(
            report.checks["disk_space"].message,
            "Uploads directory does not exist"
        );
        assert!(report.is_serving());
    }

    #[tokio::test]
    async fn test_memory_threshold_warns() {
        let dir = tempdir().unwrap();
        let monitor = HealthMonitor::new(
            config(true, 0),
            Arc::new(InMemoryMovieStore::new()),
            dir.path().to_path_buf(),
        );

        let report = monitor.check_now().await;
        assert_eq!(report.checks["memory"].message, "High memory usage detected");
        assert_eq!(report.status, HealthStatus::Warning);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_readiness() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMovieStore::new());
        store.set_unavailable(Some("connection refused")).await;
        let monitor = HealthMonitor::new(config(true, u64::MAX), store, dir.path().to_path_buf());

        let readiness = monitor.readiness().await;

        assert!(!readiness.ready);
        assert_eq!(
            readiness.critical_checks["database"],
            HealthStatus::Unhealthy
        );
        assert_eq!(
            readiness.critical_checks["environment"],
            HealthStatus::Healthy
        );
        let cached = monitor.cached_status().await;
        assert_eq!(cached.status, HealthStatus::Unhealthy);
        assert!(cached.checks["database"]
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_missing_credentials_reported() {
        let dir = tempdir().unwrap();
        let monitor = HealthMonitor::new(
            config(false, u64::MAX),
            Arc::new(InMemoryMovieStore::new()),
            dir.path().to_path_buf(),
        );

        let report = monitor.check_now().await;
        let environment = &report.checks["environment"];

        assert_eq!(environment.status, HealthStatus::Unhealthy);
        assert_eq!(
            environment.error.as_deref(),
            Some("Missing: CLOUDINARY_API_KEY, CLOUDINARY_API_SECRET")
        );
        assert_eq!(
            report.checks["cloudinary"].message,
            "Cloudinary configuration incomplete"
        );
    }

    #[tokio::test]
    async fn test_cache_holds_last_sample() {
        let dir = tempdir().unwrap();
        let monitor = HealthMonitor::new(
            config(true, u64::MAX),
            Arc::new(InMemoryMovieStore::new()),
            dir.path().to_path_buf(),
        );

        assert!(monitor.cached_status().await.checks.is_empty());
        let report = monitor.check_now().await;
        assert_eq!(monitor.cached_status().await, report);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let result = run_check(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), String>(())
        })
        .await;
        assert!(result.unwrap_err().starts_with("Timed out"));
    }

    #[test]
    fn test_memory_threshold_is_exclusive() {
        assert!(!exceeds_threshold(1024, 1024));
        assert!(exceeds_threshold(1025, 1024));
        assert!(!exceeds_threshold(0, 0));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(Some("abcdefgh")), "***efgh");
        assert_eq!(mask_secret(Some("ab")), "***ab");
        assert_eq!(mask_secret(None), "not set");
    }
}
