use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::response::{ApiResponse, MessageResponse};
use crate::services::intake;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
use watchly_core::models::{Movie, UpdateMovieRequest};

fn parse_id(id: &str) -> Result<Uuid, HttpAppError> {
    Ok(Uuid::parse_str(id)?)
}

#[utoipa::path(
    post,
    path = "/api/movies/upload",
    tag = "movies",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "Fields `video` and `thumbnail` (files) plus optional `title`, `description`, `category`, `language`, `quality`"
    ),
    responses(
        (status = 201, description = "Movie uploaded", body = ApiResponse<Movie>),
        (status = 400, description = "Missing file, wrong type, too large or too many files", body = ErrorResponse),
        (status = 500, description = "Media host or database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_movie(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Movie>>), HttpAppError> {
    let mut batch = state.staging.begin();
    let metadata = match intake::read_upload(&mut multipart, &mut batch).await {
        Ok(metadata) => metadata,
        Err(e) => {
            batch.release_all().await;
            return Err(e.into());
        }
    };

    let movie = state.movies.create_movie(metadata, batch).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(movie).with_message("Movie uploaded successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/movies",
    tag = "movies",
    responses(
        (status = 200, description = "All movies, newest first", body = ApiResponse<Vec<Movie>>),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Movie>>>, HttpAppError> {
    let movies = state.movies.list_movies().await?;
    Ok(Json(ApiResponse::success(movies)))
}

#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    tag = "movies",
    params(("id" = String, Path, description = "Movie id (UUID)")),
    responses(
        (status = 200, description = "Movie found", body = ApiResponse<Movie>),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Movie>>, HttpAppError> {
    let movie = state.movies.get_movie(parse_id(&id)?).await?;
    Ok(Json(ApiResponse::success(movie)))
}

#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    tag = "movies",
    params(("id" = String, Path, description = "Movie id (UUID)")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated", body = ApiResponse<Movie>),
        (status = 400, description = "Malformed id or invalid body", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateMovieRequest>,
) -> Result<Json<ApiResponse<Movie>>, HttpAppError> {
    let id = parse_id(&id)?;
    request.validate()?;

    let movie = state.movies.update_movie(id, &request).await?;
    Ok(Json(
        ApiResponse::success(movie).with_message("Movie updated successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    tag = "movies",
    params(("id" = String, Path, description = "Movie id (UUID)")),
    responses(
        (status = 200, description = "Movie deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    state.movies.delete_movie(parse_id(&id)?).await?;
    Ok(Json(MessageResponse::new("Movie deleted successfully")))
}
