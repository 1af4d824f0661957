use axum::extract::State;
use axum::Json;

use crate::api::ApiError;
use crate::models::{BuildReport, IndexStatus, RebuildRequest};
use crate::state::AppState;

/// POST /api/search/rebuild - Run the index builder inline for the named
/// users plus everything currently stale
pub async fn rebuild(
    State(state): State<AppState>,
    Json(req): Json<RebuildRequest>,
) -> Result<Json<BuildReport>, ApiError> {
    tracing::info!(requested = req.user_ids.len(), "manual search rebuild");
    let report = state.builder.run(&req.user_ids).await?;
    Ok(Json(report))
}

/// GET /api/search/status - Staleness and index counters
pub async fn status(State(state): State<AppState>) -> Json<IndexStatus> {
    let (profiles, embeddings_stale, search_vectors_stale, embedded) =
        state.store.staleness_counts();
    Json(IndexStatus {
        profiles,
        embeddings_stale,
        search_vectors_stale,
        embedded,
        indexed_documents: state.text_index.doc_count(),
    })
}
