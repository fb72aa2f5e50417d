//! Error types for the todo API client.
//!
//! # Design
//! The statuses a caller can act on (404, 409, 400) get dedicated variants
//! carrying the server's error message. Any other unexpected status lands in
//! `HttpError` with the raw status code and body.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 409: the requested id is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The server returned 400: malformed body, empty title or bad id.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}
