//! Transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data: the client builds an `HttpRequest`,
//! the host executes it with whatever HTTP stack it has and hands back an
//! `HttpResponse`. Owned fields keep the values free of lifetimes.

use crate::types::ErrorBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data. `path` is an absolute URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// The `error` field of a JSON error body, or the raw body when the
    /// server sent something else.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .map(|body| body.error)
            .unwrap_or_else(|_| self.body.clone())
    }
}
