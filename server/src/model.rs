//! The todo record and its validation rules.

use serde::{Deserialize, Serialize};

use crate::error::TodoError;

/// Identifier sentinel for a todo that has not been stored yet.
pub const UNASSIGNED_ID: u64 = 0;

/// A single todo item.
///
/// Every field is optional on the wire and falls back to its zero value, so a
/// payload without `id` decodes to an unassigned record and a payload without
/// `title` decodes and is then rejected by [`Todo::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl Todo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn is_assigned(&self) -> bool {
        self.id != UNASSIGNED_ID
    }

    /// Checks the invariants a record must hold before it is persisted.
    pub fn validate(&self) -> Result<(), TodoError> {
        if self.title.is_empty() {
            return Err(TodoError::Invalid("title cannot be empty".to_string()));
        }
        Ok(())
    }
}
