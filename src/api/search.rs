use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::ApiError;
use crate::models::{SearchMode, SearchParams, SearchResponse};
use crate::state::AppState;

/// GET /api/search?q=<text>&mode=default|ai - Lexical-first profile search:
///   1. Lexical pass over the full-text index; if it matches, return it
///   2. Otherwise embed the query and fuse semantic + lexical candidates (RRF)
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let mode = SearchMode::parse(params.mode.as_deref()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown search mode '{}'",
            params.mode.as_deref().unwrap_or_default()
        ))
    })?;

    let users = state.search.search(query, mode).await?;
    tracing::info!(mode = ?mode, results = users.len(), "search served");

    let config = state.search.config();
    let ttl = match mode {
        SearchMode::Default => config.cache_ttl_secs,
        SearchMode::Ai => config.ai_cache_ttl_secs,
    };
    let cache_control = format!(
        "public, s-maxage={ttl}, stale-while-revalidate={}",
        config.stale_while_revalidate_secs
    );

    Ok((
        [(header::CACHE_CONTROL, cache_control)],
        Json(SearchResponse { users }),
    )
        .into_response())
}
