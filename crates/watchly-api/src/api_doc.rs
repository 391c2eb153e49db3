//! OpenAPI documentation, served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::response;
use crate::services;
use watchly_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Watchly API",
        version = "0.1.0",
        description = "Movie catalog backend. Uploads a video and its thumbnail to the media host, stores the catalog record and reports service health."
    ),
    paths(
        // Movies
        handlers::movies::upload_movie,
        handlers::movies::list_movies,
        handlers::movies::get_movie,
        handlers::movies::update_movie,
        handlers::movies::delete_movie,
        // Health
        handlers::health::health_check,
        handlers::health::detailed_health_check,
        handlers::health::cached_health_check,
        handlers::health::ping,
        handlers::health::readiness_check,
        handlers::health::liveness_check,
    ),
    components(
        schemas(
            models::Movie,
            models::UpdateMovieRequest,
            models::HealthStatus,
            models::CheckResult,
            response::MessageResponse,
            handlers::health::HealthResponse,
            handlers::health::PingResponse,
            handlers::health::ReadinessResponse,
            handlers::health::LivenessResponse,
            services::SystemInfo,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "movies", description = "Movie upload and catalog operations"),
        (name = "health", description = "Health, readiness and liveness probes")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
