//! Wire DTOs for the todo API.
//!
//! # Design
//! Defined independently of the server crate so the client never links axum.
//! The end-to-end test catches schema drift between the two.

use serde::{Deserialize, Serialize};

/// A stored todo as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Request payload for creating a todo. Leave `id` unset to let the server
/// assign one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl CreateTodo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Request payload for replacing a todo. Every field is sent; the server does
/// not merge with the stored record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
