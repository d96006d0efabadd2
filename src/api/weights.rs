use axum::extract::State;
use axum::Json;

use crate::models::{HealthResponse, WeightsResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        weights_version: state.weights.snapshot().version.clone(),
    })
}

/// GET /weights - The snapshot every new request currently resolves against.
pub async fn get_weights(State(state): State<AppState>) -> Json<WeightsResponse> {
    let snapshot = state.weights.snapshot();
    Json(WeightsResponse {
        fingerprint: snapshot.fingerprint(),
        source: state.weights.source().map(|p| p.display().to_string()),
        weights: (*snapshot).clone(),
    })
}
