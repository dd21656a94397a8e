//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON: `{"success": false, "error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::checkout::{GatewayError, PersistenceError};
use crate::payments::SessionError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Supabase operation failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Razorpay operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Payment session lookup failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Persistence(_) => StatusCode::BAD_GATEWAY,
            Self::Gateway(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(err) => match err {
                SessionError::Unknown(_) => StatusCode::NOT_FOUND,
                SessionError::NotReady(_) => StatusCode::CONFLICT,
                SessionError::Abandoned(_) => StatusCode::GONE,
                SessionError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Persistence(_)
                | Self::Gateway(_)
                | Self::Internal(_)
                | Self::Session(SessionError::Poisoned)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) | Self::Session(SessionError::Poisoned) => {
                "Internal server error".to_string()
            }
            Self::Persistence(_) => "External service error".to_string(),
            Self::Gateway(_) => "Unable to create payment order".to_string(),
            Self::Session(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
