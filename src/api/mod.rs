pub mod index;
pub mod profiles;
pub mod search;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use crate::error::{BuildError, PersistenceError, SearchError};
use crate::models::{Contact, Education, Project, WorkExperience};
use crate::state::AppState;

/// Errors surfaced at the HTTP boundary. Internal failures are logged in full
/// under a request id and only the id reaches the client.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::UserNotFound(_) | PersistenceError::EntryNotFound { .. } => {
                Self::NotFound(e.to_string())
            }
            PersistenceError::UsernameTaken(_) => Self::Conflict(e.to_string()),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Validation(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<BuildError> for ApiError {
    fn from(e: BuildError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(e) => {
                let request_id = Uuid::new_v4().to_string();
                tracing::error!(request_id = %request_id, error = ?e, "request failed");
                let body = json!({ "error": "Internal server error", "requestId": request_id });
                let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert("x-request-id", value);
                }
                return response;
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// All API routes, with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(profiles::create_user))
        .route(
            "/api/users/{id}",
            get(profiles::get_user).patch(profiles::update_user),
        )
        .route("/api/users/{id}/projects", post(profiles::add_entry::<Project>))
        .route(
            "/api/users/{id}/projects/{entry_id}",
            put(profiles::update_entry::<Project>).delete(profiles::remove_entry::<Project>),
        )
        .route(
            "/api/users/{id}/projects/{entry_id}/visibility",
            patch(profiles::set_visibility::<Project>),
        )
        .route("/api/users/{id}/education", post(profiles::add_entry::<Education>))
        .route(
            "/api/users/{id}/education/{entry_id}",
            put(profiles::update_entry::<Education>).delete(profiles::remove_entry::<Education>),
        )
        .route(
            "/api/users/{id}/education/{entry_id}/visibility",
            patch(profiles::set_visibility::<Education>),
        )
        .route(
            "/api/users/{id}/experience",
            post(profiles::add_entry::<WorkExperience>),
        )
        .route(
            "/api/users/{id}/experience/{entry_id}",
            put(profiles::update_entry::<WorkExperience>)
                .delete(profiles::remove_entry::<WorkExperience>),
        )
        .route(
            "/api/users/{id}/experience/{entry_id}/visibility",
            patch(profiles::set_visibility::<WorkExperience>),
        )
        .route("/api/users/{id}/contacts", post(profiles::add_entry::<Contact>))
        .route(
            "/api/users/{id}/contacts/{entry_id}",
            put(profiles::update_entry::<Contact>).delete(profiles::remove_entry::<Contact>),
        )
        .route(
            "/api/users/{id}/contacts/{entry_id}/visibility",
            patch(profiles::set_visibility::<Contact>),
        )
        .route("/api/search", get(search::search))
        .route("/api/search/rebuild", post(index::rebuild))
        .route("/api/search/status", get(index::status))
        .with_state(state)
}
