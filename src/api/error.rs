//! Caller-facing failures. Detail is logged here and never returned.

use crate::error::{IntakeError, PersistenceError};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Unavailable(IntakeError),
    Storage(PersistenceError),
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(detail) => {
                tracing::debug!(error = %detail, "request rejected");
                (StatusCode::BAD_REQUEST, "Invalid request")
            }
            ApiError::Unavailable(e) => {
                tracing::warn!(error = %e, "submission refused");
                (StatusCode::SERVICE_UNAVAILABLE, "Detector unavailable")
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "threat store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error occurred")
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::InvalidRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::InvalidRequest(err.body_text())
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        ApiError::Unavailable(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::Storage(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
