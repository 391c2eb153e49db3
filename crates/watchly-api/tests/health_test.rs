//! Health endpoint integration tests.

mod helpers;

use axum::http::StatusCode;
use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_ping_and_liveness() {
    let app = setup_test_app().await;

    let ping = app.client().get("/health/ping").await;
    ping.assert_status_ok();
    let ping = ping.json::<Value>();
    assert_eq!(ping["success"], true);
    assert_eq!(ping["message"], "pong");

    let live = app.client().get("/health/live").await;
    live.assert_status_ok();
    let live = live.json::<Value>();
    assert_eq!(live["status"], "alive");
    assert!(live["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_health_check_healthy() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["message"], "Server is healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body.get("checks").is_none());
}

#[tokio::test]
async fn test_cached_reflects_last_sample() {
    let app = setup_test_app().await;

    // Nothing sampled yet: the placeholder report has no checks
    let before = app.client().get("/health/cached").await;
    before.assert_status_ok();
    let before = before.json::<Value>();
    assert_eq!(before["cached"], true);
    assert_eq!(before["uptime"], 0.0);

    app.store.set_unavailable(Some("connection refused")).await;
    app.client()
        .get("/health")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let after = app.client().get("/health/cached").await;
    after.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let after = after.json::<Value>();
    assert_eq!(after["status"], "unhealthy");
    assert_eq!(after["success"], false);
    assert_eq!(after["message"], "Server has issues");
}

#[tokio::test]
async fn test_readiness() {
    let app = setup_test_app().await;

    let ready = app.client().get("/health/ready").await;
    ready.assert_status_ok();
    let ready = ready.json::<Value>();
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["message"], "Service is ready");
    assert_eq!(ready["critical_checks"]["database"], "healthy");
    assert_eq!(ready["critical_checks"]["environment"], "healthy");

    app.store.set_unavailable(Some("connection refused")).await;

    let not_ready = app.client().get("/health/ready").await;
    not_ready.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let not_ready = not_ready.json::<Value>();
    assert_eq!(not_ready["success"], false);
    assert_eq!(not_ready["status"], "not ready");
    assert_eq!(not_ready["message"], "Service is not ready");
    assert_eq!(not_ready["critical_checks"]["database"], "unhealthy");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = setup_test_app().await;

    let response = app.client().get("/health/detailed").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    let checks = body["checks"].as_object().unwrap();
    let mut names: Vec<&str> = checks.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["cloudinary", "database", "disk_space", "environment", "memory"]
    );
    for (name, check) in checks {
        assert_eq!(check["status"], "healthy", "{}: {}", name, check);
    }

    // Credentials never leave the process unmasked
    let cloudinary = checks["cloudinary"].to_string();
    assert!(!cloudinary.contains("test-secret-5678"));
    assert!(!cloudinary.contains("test-key-1234"));

    assert_eq!(body["system"]["pid"], std::process::id());
    assert_eq!(checks["disk_space"]["details"]["files_count"], 0);
}
