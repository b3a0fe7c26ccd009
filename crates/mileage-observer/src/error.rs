//! Error types for the read-back API.
//!
//! [`ObserverError`] is converted into an HTTP response carrying a JSON
//! body of the form `{ "error": "...", "status": 400 }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mileage_core::AggregationError;
use mileage_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path segment, query parameter or request body was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// An on-demand aggregation failed.
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::Aggregation(AggregationError::InvalidRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) | Self::Aggregation(AggregationError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
