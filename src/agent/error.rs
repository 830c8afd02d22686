// ABOUTME: Agent API errors and their HTTP responses.
// ABOUTME: Maps deploy and status failures to status codes with a JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::deploy::{DeployError, DeployErrorKind, StatusError};

/// Body of every non-2xx agent response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Set when a deployment run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeployErrorKind>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("deployment failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Deploy(e) if e.kind() == DeployErrorKind::Precondition => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Deploy(e) if e.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Deploy(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Deploy(_) => "deploy_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<StatusError> for ApiError {
    fn from(e: StatusError) -> Self {
        match e {
            StatusError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            kind: match &self {
                ApiError::Deploy(e) => Some(e.kind()),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
