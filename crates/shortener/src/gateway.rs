//! HTTP gateway: JSON routes mapped onto the RPCs, plus the redirect route
//! `GET /d/{code}`. Handlers call the same [`ShortenerService`] value the
//! tonic server wraps, reusing the protocol's message types for JSON bodies.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use proto_shortener::shortener as messages;

use crate::service::ShortenerService;

pub fn router(service: Arc<ShortenerService>) -> Router {
    Router::new()
        .route("/v1/shorten", post(shorten))
        .route("/v1/url/:code", get(get_url))
        .route("/v1/users", post(create_user))
        .route("/v1/users/:email/api-key", get(fetch_api_key))
        .route("/d/:code", get(redirect))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(service)
}

/// An RPC status surfaced as an HTTP response: mapped status code, JSON
/// error body.
#[derive(Debug)]
pub struct ApiError(tonic::Status);

impl From<tonic::Status> for ApiError {
    fn from(status: tonic::Status) -> Self {
        ApiError(status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            tonic::Code::InvalidArgument => StatusCode::BAD_REQUEST,
            tonic::Code::Unauthenticated => StatusCode::UNAUTHORIZED,
            tonic::Code::NotFound => StatusCode::NOT_FOUND,
            tonic::Code::AlreadyExists => StatusCode::CONFLICT,
            tonic::Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.message() }));
        (status, body).into_response()
    }
}

async fn shorten(
    State(service): State<Arc<ShortenerService>>,
    Json(request): Json<messages::ShortenUrlRequest>,
) -> Result<Json<messages::ShortenUrlResponse>, ApiError> {
    let short_url = service.shorten(&request.api_key, &request.long_url).await?;
    Ok(Json(messages::ShortenUrlResponse { short_url }))
}

async fn get_url(
    State(service): State<Arc<ShortenerService>>,
    Path(code): Path<String>,
) -> Result<Json<messages::GetUrlResponse>, ApiError> {
    let long_url = service.resolve(&code).await?;
    Ok(Json(messages::GetUrlResponse { long_url }))
}

async fn create_user(
    State(service): State<Arc<ShortenerService>>,
    Json(request): Json<messages::CreateUserRequest>,
) -> Result<Json<messages::CreateUserResponse>, ApiError> {
    let user = service
        .create_user(&request.first_name, &request.last_name, &request.email)
        .await?;
    Ok(Json(messages::CreateUserResponse {
        user_id: user.id.to_string(),
        api_key: user.api_key.to_string(),
    }))
}

async fn fetch_api_key(
    State(service): State<Arc<ShortenerService>>,
    Path(email): Path<String>,
) -> Result<Json<messages::FetchApiKeyResponse>, ApiError> {
    let api_key = service.fetch_api_key(&email).await?;
    Ok(Json(messages::FetchApiKeyResponse { api_key }))
}

/// `GET /d/{code}`: 302 to the mapped URL, or 404.
async fn redirect(
    State(service): State<Arc<ShortenerService>>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let long_url = service.resolve(&code).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, long_url)]).into_response())
}
