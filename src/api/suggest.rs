use axum::extract::{Path, State};
use axum::Json;

use crate::error::{SearchError, SearchResult};
use crate::models::{SuggestRequest, SuggestResponse};
use crate::pipeline::ApiVersion;
use crate::state::AppState;

/// POST /suggest/{version} - Taxonomy suggestions; `version` is `v1`, `v2`
/// or `v3` and selects the enhancement pipeline.
pub async fn suggest(
    State(state): State<AppState>,
    Path(version): Path<String>,
    Json(req): Json<SuggestRequest>,
) -> SearchResult<Json<SuggestResponse>> {
    let version: ApiVersion = version.parse().map_err(SearchError::Validation)?;
    let response = state.suggester.suggest(version, req).await?;
    Ok(Json(response))
}
