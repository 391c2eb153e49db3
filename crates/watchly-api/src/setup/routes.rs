//! Route configuration and setup

use crate::handlers::{health, movies};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use watchly_core::Config;

/// Room for multipart framing and text fields on top of the file payloads
const MULTIPART_OVERHEAD_BYTES: u64 = 16 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let upload_limit = upload_body_limit(config);
    tracing::info!(upload_body_limit_bytes = upload_limit, "Upload body limit configured");

    let app = Router::new()
        .merge(movie_routes(upload_limit))
        .merge(health_routes())
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .with_state(state)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn movie_routes(upload_limit: usize) -> Router<Arc<AppState>> {
    // Multipart streams to disk; the only cap is the request-level one
    let upload: Router<Arc<AppState>> = Router::new()
        .route("/api/movies/upload", post(movies::upload_movie))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    Router::new()
        .merge(upload)
        .route("/api/movies", get(movies::list_movies))
        .route(
            "/api/movies/{id}",
            get(movies::get_movie)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::detailed_health_check))
        .route("/health/cached", get(health::cached_health_check))
        .route("/health/ping", get(health::ping))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
}

/// Largest accepted upload request: every allowed file at the size limit plus overhead.
fn upload_body_limit(config: &Config) -> usize {
    let bytes = config
        .max_file_size_bytes()
        .saturating_mul(config.max_files_per_request() as u64)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
