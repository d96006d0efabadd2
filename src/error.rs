//! Request-facing errors.
//!
//! Only two kinds of failure ever reach a caller: bad input and an
//! unreachable retrieval backend. Adapter and weight-reload failures are
//! absorbed where they happen.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::weights::WeightValidationError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Search backend unavailable: {0}")]
    Backend(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SearchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SearchError::Validation(msg.into())
    }

    pub fn invalid_weights(errors: &[WeightValidationError]) -> Self {
        let detail = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        SearchError::Validation(format!("custom weights rejected: {detail}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::Validation(_) => StatusCode::BAD_REQUEST,
            SearchError::Backend(_) => StatusCode::BAD_GATEWAY,
            SearchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "validation_error",
            SearchError::Backend(_) => "backend_error",
            SearchError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        if !matches!(self, SearchError::Validation(_)) {
            tracing::error!("{self}");
        }
        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }));
        (self.status(), body).into_response()
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
