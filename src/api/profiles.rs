use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::ApiError;
use crate::models::{NewProfile, ProfileUpdate, SectionEntry, UserProfile, VisibilityUpdate};
use crate::state::AppState;

/// POST /api/users - Create a profile (not searchable until its first edit)
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewProfile>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    if req.name.trim().is_empty() || req.username.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name and username are required".to_string(),
        ));
    }
    let profile = state.profiles.create_profile(req)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.profiles.get_profile(&id)?))
}

/// PATCH /api/users/{id} - Update core fields; absent fields are untouched
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    if matches!(&req.name, Some(n) if n.trim().is_empty())
        || matches!(&req.username, Some(u) if u.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "name and username cannot be empty".to_string(),
        ));
    }
    Ok(Json(state.profiles.update_profile(&id, req)?))
}

/// POST /api/users/{id}/{section}
pub async fn add_entry<T: SectionEntry>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(entry): Json<T>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let added = state.profiles.add_entry(&id, entry)?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// PUT /api/users/{id}/{section}/{entry_id}
pub async fn update_entry<T: SectionEntry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(entry): Json<T>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(state.profiles.update_entry(&id, &entry_id, entry)?))
}

/// PATCH /api/users/{id}/{section}/{entry_id}/visibility
pub async fn set_visibility<T: SectionEntry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<VisibilityUpdate>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(
        state.profiles.set_entry_hidden::<T>(&id, &entry_id, req.hidden)?,
    ))
}

/// DELETE /api/users/{id}/{section}/{entry_id}
pub async fn remove_entry<T: SectionEntry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.profiles.remove_entry::<T>(&id, &entry_id)?;
    Ok(StatusCode::NO_CONTENT)
}
