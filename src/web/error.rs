//! API error type and the `{status, data|message}` response envelope.

use crate::scheduler::ScheduleError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// An error response carrying an HTTP status and a client-safe message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::Invalid(v) => ApiError::bad_request(v.to_string()),
            ScheduleError::NotFound => ApiError::not_found("Schedule configuration not found"),
            ScheduleError::Internal(e) => {
                error!(error = ?e, "schedule operation failed");
                ApiError::internal_error("Schedule operation failed")
            }
        }
    }
}

/// Wrap a payload in the success envelope.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "data": data }))
}

/// Log a database-layer failure and hide the details from the client.
pub fn db_error(operation: &str, e: anyhow::Error) -> ApiError {
    error!(error = ?e, operation, "database operation failed");
    ApiError::internal_error(format!("{operation} failed"))
}
