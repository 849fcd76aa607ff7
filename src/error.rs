use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors raised by the portal core: auth bootstrap, persistence and the
/// project workflows.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// The auth provider rejected credentials or a sign-up.
    #[error("{0}")]
    Auth(String),

    /// The profile lookup exceeded its fixed bound.
    #[error("Profile fetch timeout after {} seconds", .0.as_secs())]
    ProfileFetchTimeout(Duration),

    /// The profile row never became visible after sign-up.
    #[error("Profile creation failed, please try again.")]
    ProfileCreationTimeout,

    /// Persistence failure other than "no row found".
    #[error("Database error: {0}")]
    Query(String),

    /// A form constraint was violated before any network call.
    #[error("{0}")]
    Validation(String),

    /// The notification relay could not be reached or refused the request.
    #[error("Failed to send email: {0}")]
    Notification(String),

    /// A submission is already outstanding.
    #[error("Already submitting, request ignored")]
    Busy,

    #[error("{0} not found")]
    NotFound(String),
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        PortalError::Query(err.to_string())
    }
}

/// HTTP-facing error of the notification relay.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    RateLimited(String),
    Unavailable(String),
    Delivery(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::Unavailable(msg) => write!(f, "Unavailable: {msg}"),
            AppError::Delivery(msg) => write!(f, "Delivery Error: {msg}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            // The sender's reason is passed through so callers can log it.
            AppError::Delivery(msg) => {
                tracing::error!("Email delivery failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
