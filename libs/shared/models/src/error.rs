use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Failure kinds produced by the scheduling core. Every operation returns
/// one of these as a typed result; none are retried internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Slot already taken: {0}")]
    Conflict(String),

    #[error("Doctor {0} is not approved for bookings")]
    NotSchedulable(Uuid),

    #[error("No chair available on {date} at {time}")]
    NoCapacity { date: NaiveDate, time: NaiveTime },

    /// The backing table store refused or failed a write; nothing was
    /// committed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        let message = err.to_string();
        match err {
            SchedulingError::Validation(_) => AppError::ValidationError(message),
            SchedulingError::NotFound(_) => AppError::NotFound(message),
            SchedulingError::Conflict(_) => AppError::Conflict(message),
            SchedulingError::NotSchedulable(_) => AppError::Forbidden(message),
            SchedulingError::NoCapacity { .. } => AppError::Conflict(message),
            SchedulingError::Storage(_) => AppError::ExternalService(message),
        }
    }
}
