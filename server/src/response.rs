//! Translation from domain errors to HTTP responses.
//!
//! Every error response carries a JSON body of the shape
//! `{"error": "<message>"}`. This is the only place that picks status codes
//! for failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::error::TodoError;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timeout")]
    Timeout,

    #[error("{0}")]
    Conflict(String),

    /// The detail is logged but never sent to the client.
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_body() -> Self {
        Self::BadRequest("invalid request body".to_string())
    }

    pub fn invalid_id() -> Self {
        Self::BadRequest("invalid todo ID".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Invalid(message) => Self::BadRequest(message),
            TodoError::NotFound(_) => Self::NotFound("todo not found".to_string()),
            TodoError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            TodoError::Internal(detail) => Self::Internal(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "request failed with internal error");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
