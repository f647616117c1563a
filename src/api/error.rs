//! API error type and its HTTP mapping.
//!
//! Error bodies follow the `{"detail": "..."}` shape the frontend expects.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid client input: missing/empty required field, unknown status value.
    #[error("{0}")]
    Validation(String),

    /// The referenced task id does not exist.
    #[error("task {0} not found")]
    NotFound(i64),

    /// Anything else. The message is logged, never sent to the client.
    #[error("internal server error")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("task {} not found", id)),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
