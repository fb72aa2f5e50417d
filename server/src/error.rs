//! Domain error taxonomy shared by the store and the service layer.

use thiserror::Error;

/// Errors returned by [`TodoStore`](crate::store::TodoStore) and
/// [`TodoService`](crate::service::TodoService).
///
/// These are plain values; nothing in the storage or operation layers panics
/// as part of its normal control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    /// The caller supplied data that breaks a record invariant.
    #[error("{0}")]
    Invalid(String),

    #[error("todo {0} not found")]
    NotFound(u64),

    /// A create call supplied an id that is already taken.
    #[error("todo with ID {0} already exists")]
    AlreadyExists(u64),

    /// Storage failed for a reason the caller cannot fix.
    #[error("internal error: {0}")]
    Internal(String),
}
