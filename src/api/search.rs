use axum::extract::State;
use axum::Json;

use crate::error::SearchResult;
use crate::models::{SearchRequest, SearchResponse};
use crate::state::AppState;

/// POST /search - Hybrid multi-strategy search:
///   1. Embedding + intent classification, concurrently
///   2. One batched multi-search over every weighted strategy
///   3. Weighted-sum combination with per-source breakdown
///   4. Optional rerank of the page, then cursor + metadata
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> SearchResult<Json<SearchResponse>> {
    let response = state.orchestrator.search(req).await?;
    Ok(Json(response))
}
