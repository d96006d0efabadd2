pub mod search;
pub mod suggest;
pub mod weights;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(weights::health))
        .route("/weights", get(weights::get_weights))
        .route("/search", post(search::search))
        .route("/suggest/{version}", post(suggest::suggest))
        .with_state(state)
}
