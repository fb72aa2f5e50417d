//! Use-case layer: validation in front of the storage engine.

use std::sync::Arc;

use tracing::debug;

use crate::error::TodoError;
use crate::model::Todo;
use crate::store::TodoStore;

/// Todo use cases. Store errors are returned unchanged.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub fn create_todo(&self, todo: Todo) -> Result<Todo, TodoError> {
        todo.validate()?;
        let created = self.store.create(todo)?;
        debug!(id = created.id, "todo created");
        Ok(created)
    }

    pub fn get_all_todos(&self) -> Result<Vec<Todo>, TodoError> {
        self.store.get_all()
    }

    pub fn get_todo_by_id(&self, id: u64) -> Result<Todo, TodoError> {
        self.store.get_by_id(id)
    }

    /// Replaces the todo stored under `id`. Any id inside `todo` is ignored.
    pub fn update_todo(&self, id: u64, mut todo: Todo) -> Result<Todo, TodoError> {
        todo.validate()?;
        if !self.store.exists(id) {
            return Err(TodoError::NotFound(id));
        }
        todo.id = id;
        let updated = self.store.update(todo)?;
        debug!(id, "todo updated");
        Ok(updated)
    }

    pub fn delete_todo(&self, id: u64) -> Result<(), TodoError> {
        self.store.delete(id)?;
        debug!(id, "todo deleted");
        Ok(())
    }
}
