//! Storage engine for todo records.
//!
//! # Design
//! [`TodoStore`] is the capability set the service layer depends on, so other
//! backends can be dropped in behind `Arc<dyn TodoStore>`. The bundled
//! [`InMemoryTodoStore`] keeps the record map and the id allocator inside one
//! state struct behind one `RwLock`, so an id is never observable before the
//! record that claimed it. Every call takes the lock for exactly one operation.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::TodoError;
use crate::model::Todo;

/// Synchronous, thread-safe storage for todo records.
pub trait TodoStore: Send + Sync {
    /// Inserts `todo`, assigning an id when it carries the unassigned sentinel.
    fn create(&self, todo: Todo) -> Result<Todo, TodoError>;

    /// Returns a snapshot of every stored record. Order is not part of the contract.
    fn get_all(&self) -> Result<Vec<Todo>, TodoError>;

    fn get_by_id(&self, id: u64) -> Result<Todo, TodoError>;

    /// Replaces the record stored under `todo.id` wholesale.
    fn update(&self, todo: Todo) -> Result<Todo, TodoError>;

    fn delete(&self, id: u64) -> Result<(), TodoError>;

    fn exists(&self, id: u64) -> bool;
}

struct StoreState {
    todos: BTreeMap<u64, Todo>,
    /// High-water mark, greater than every id ever stored. `None` once the
    /// id space is used up.
    next_id: Option<u64>,
}

impl StoreState {
    fn allocate_id(&mut self) -> Result<u64, TodoError> {
        let id = self
            .next_id
            .ok_or_else(|| TodoError::Internal("todo id space exhausted".to_string()))?;
        self.next_id = id.checked_add(1);
        Ok(id)
    }

    fn reserve_id(&mut self, id: u64) -> Result<(), TodoError> {
        if self.todos.contains_key(&id) {
            return Err(TodoError::AlreadyExists(id));
        }
        self.next_id = match (self.next_id, id.checked_add(1)) {
            (Some(current), Some(after)) => Some(current.max(after)),
            _ => None,
        };
        Ok(())
    }
}

/// Process-local store backed by an ordered map.
pub struct InMemoryTodoStore {
    state: RwLock<StoreState>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                todos: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, TodoError> {
        self.state
            .read()
            .map_err(|_| TodoError::Internal("todo store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, TodoError> {
        self.state
            .write()
            .map_err(|_| TodoError::Internal("todo store lock poisoned".to_string()))
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore for InMemoryTodoStore {
    fn create(&self, mut todo: Todo) -> Result<Todo, TodoError> {
        let mut state = self.write()?;
        if !todo.is_assigned() {
            todo.id = state.allocate_id()?;
        } else {
            state.reserve_id(todo.id)?;
        }
        state.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    fn get_all(&self) -> Result<Vec<Todo>, TodoError> {
        let state = self.read()?;
        Ok(state.todos.values().cloned().collect())
    }

    fn get_by_id(&self, id: u64) -> Result<Todo, TodoError> {
        let state = self.read()?;
        state.todos.get(&id).cloned().ok_or(TodoError::NotFound(id))
    }

    fn update(&self, todo: Todo) -> Result<Todo, TodoError> {
        let mut state = self.write()?;
        let slot = state
            .todos
            .get_mut(&todo.id)
            .ok_or(TodoError::NotFound(todo.id))?;
        *slot = todo.clone();
        Ok(todo)
    }

    fn delete(&self, id: u64) -> Result<(), TodoError> {
        let mut state = self.write()?;
        state
            .todos
            .remove(&id)
            .map(|_| ())
            .ok_or(TodoError::NotFound(id))
    }

    fn exists(&self, id: u64) -> bool {
        // Presence checks never fail, so read through a poisoned lock.
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.todos.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn create_assigns_sequential_ids_from_one() {
        let store = InMemoryTodoStore::new();
        let first = store.create(Todo::new("a")).unwrap();
        let second = store.create(Todo::new("b")).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn create_with_explicit_id_advances_allocator() {
        let store = InMemoryTodoStore::new();
        let explicit = store.create(Todo::new("explicit").with_id(10)).unwrap();
        assert_eq!(explicit.id, 10);

        let next = store.create(Todo::new("auto")).unwrap();
        assert_eq!(next.id, 11);
    }

    #[test]
    fn explicit_id_below_high_water_mark_keeps_allocator() {
        let store = InMemoryTodoStore::new();
        store.create(Todo::new("a").with_id(10)).unwrap();
        store.create(Todo::new("b").with_id(3)).unwrap();
        let next = store.create(Todo::new("auto")).unwrap();
        assert_eq!(next.id, 11);
    }

    #[test]
    fn create_with_taken_id_fails_without_side_effects() {
        let store = InMemoryTodoStore::new();
        store.create(Todo::new("original").with_id(5)).unwrap();

        let err = store.create(Todo::new("duplicate").with_id(5)).unwrap_err();
        assert_eq!(err, TodoError::AlreadyExists(5));
        assert_eq!(store.get_by_id(5).unwrap().title, "original");
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = InMemoryTodoStore::new();
        let first = store.create(Todo::new("a")).unwrap();
        store.delete(first.id).unwrap();
        let second = store.create(Todo::new("b")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn exhausted_id_space_is_an_internal_error() {
        let store = InMemoryTodoStore::new();
        store.create(Todo::new("last").with_id(u64::MAX)).unwrap();

        let err = store.create(Todo::new("overflow")).unwrap_err();
        assert!(matches!(err, TodoError::Internal(_)));
        assert_eq!(store.get_all().unwrap().len(), 1);

        store.delete(u64::MAX).unwrap();
        let err = store.create(Todo::new("reuse")).unwrap_err();
        assert!(matches!(err, TodoError::Internal(_)));
    }

    #[test]
    fn get_by_id_round_trips_record() {
        let store = InMemoryTodoStore::new();
        let input = Todo::new("Buy milk").with_description("2 litres");
        let created = store.create(input.clone()).unwrap();

        let fetched = store.get_by_id(created.id).unwrap();
        assert_eq!(fetched, input.with_id(created.id));
    }

    #[test]
    fn get_all_on_empty_store_is_empty() {
        let store = InMemoryTodoStore::new();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn missing_ids_are_not_found() {
        let store = InMemoryTodoStore::new();
        assert_eq!(store.get_by_id(1).unwrap_err(), TodoError::NotFound(1));
        assert_eq!(
            store.update(Todo::new("x").with_id(1)).unwrap_err(),
            TodoError::NotFound(1)
        );
        assert_eq!(store.delete(1).unwrap_err(), TodoError::NotFound(1));
        assert!(!store.exists(1));
    }

    #[test]
    fn update_replaces_whole_record() {
        let store = InMemoryTodoStore::new();
        let created = store
            .create(Todo::new("old").with_description("old description"))
            .unwrap();

        store
            .update(Todo::new("new").with_id(created.id).with_completed(true))
            .unwrap();

        let fetched = store.get_by_id(created.id).unwrap();
        assert_eq!(fetched.title, "new");
        assert!(fetched.description.is_empty());
        assert!(fetched.completed);
    }

    #[test]
    fn second_delete_is_not_found() {
        let store = InMemoryTodoStore::new();
        let created = store.create(Todo::new("a")).unwrap();
        store.delete(created.id).unwrap();
        assert_eq!(
            store.delete(created.id).unwrap_err(),
            TodoError::NotFound(created.id)
        );
        assert!(!store.exists(created.id));
    }

    #[test]
    fn returned_copies_do_not_alias_stored_record() {
        let store = InMemoryTodoStore::new();
        let mut created = store.create(Todo::new("a")).unwrap();
        created.title = "changed locally".to_string();
        assert_eq!(store.get_by_id(created.id).unwrap().title, "a");
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let store = Arc::new(InMemoryTodoStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|n| store.create(Todo::new(format!("{worker}-{n}"))).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "id {id} assigned twice");
            }
        }
        assert_eq!(ids.len(), 400);
        assert_eq!(store.get_all().unwrap().len(), 400);
    }
}
