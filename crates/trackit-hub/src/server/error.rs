//! HTTP error responses

use crate::broadcast::PublishError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use trackit_common::{AppError, ErrorResponse};

/// Error type for every HTTP endpoint of the hub
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Publish(#[from] PublishError),

    #[error("WebSocket upgrade required")]
    UpgradeRequired,
}

impl ApiError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::App(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Publish(PublishError::Serialize(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::App(e) => e.error_code(),
            Self::Publish(PublishError::Serialize(_)) => "INTERNAL_ERROR",
            Self::Publish(PublishError::IntakeFull(_)) => "BROADCAST_DROPPED",
            Self::Publish(PublishError::HubClosed) => "HUB_UNAVAILABLE",
            Self::UpgradeRequired => "UPGRADE_REQUIRED",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Server error occurred");
        }

        let body = ErrorBody {
            error: ErrorResponse {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
