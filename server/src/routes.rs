//! HTTP routes and handlers for the todo API.
//!
//! # Design
//! Request bodies go through [`TodoBody`] instead of axum's `Json` extractor,
//! so every unreadable or malformed body maps to a 400 with the JSON error
//! shape regardless of `Content-Type`. The item id goes through [`TodoId`],
//! which reads the first path segment after `/todos/` before method dispatch:
//! a segment that is not an integer is always a 400, trailing segments are
//! ignored, and a negative id is looked up like any other missing id.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, RawPathParams, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{any, get};
use axum::{Json, Router};

use crate::model::{Todo, UNASSIGNED_ID};
use crate::response::ApiError;
use crate::service::TodoService;

/// Builds the bare router, without middleware.
pub fn router(service: TodoService) -> Router {
    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/todos",
            get(list_todos)
                .post(create_todo)
                .fallback(method_not_allowed),
        )
        .route("/todos/", any(missing_id))
        .route(
            "/todos/{*id_path}",
            get(get_todo)
                .put(update_todo)
                .delete(delete_todo)
                .fallback(item_method_not_allowed),
        )
        .fallback(route_not_found)
        .with_state(service)
}

// =============================================================================
// Extractors
// =============================================================================

/// Todo id taken from the first path segment after `/todos/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoId(pub u64);

impl<S> FromRequestParts<S> for TodoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::invalid_id())?;
        let raw = params.iter().next().map(|(_, value)| value).unwrap_or_default();
        parse_id(first_segment(raw)).map(TodoId)
    }
}

/// Todo decoded from the request body as JSON.
#[derive(Debug, Clone)]
pub struct TodoBody(pub Todo);

impl<S> FromRequest<S> for TodoBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|_| ApiError::invalid_body())?;
        decode_todo(&body).map(TodoBody)
    }
}

fn first_segment(raw: &str) -> &str {
    let raw = raw.strip_prefix('/').unwrap_or(raw);
    raw.split('/').next().unwrap_or_default()
}

/// Parses an item id. Negative integers never name a stored todo, so they
/// resolve to the unassigned sentinel and fail the lookup with a 404.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    if let Ok(id) = raw.parse::<u64>() {
        return Ok(id);
    }
    raw.parse::<i64>()
        .map(|_| UNASSIGNED_ID)
        .map_err(|_| ApiError::invalid_id())
}

fn decode_todo(body: &Bytes) -> Result<Todo, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::invalid_body())
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> &'static str {
    "OK"
}

async fn list_todos(State(service): State<TodoService>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(service.get_all_todos()?))
}

async fn create_todo(
    State(service): State<TodoService>,
    TodoBody(todo): TodoBody,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let created = service.create_todo(todo)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_todo(
    State(service): State<TodoService>,
    TodoId(id): TodoId,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(service.get_todo_by_id(id)?))
}

async fn update_todo(
    State(service): State<TodoService>,
    TodoId(id): TodoId,
    TodoBody(todo): TodoBody,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(service.update_todo(id, todo)?))
}

async fn delete_todo(
    State(service): State<TodoService>,
    TodoId(id): TodoId,
) -> Result<StatusCode, ApiError> {
    service.delete_todo(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// The id extractor runs first, so a bad id wins over a bad method.
async fn item_method_not_allowed(_id: TodoId) -> ApiError {
    ApiError::MethodNotAllowed
}

async fn missing_id() -> ApiError {
    ApiError::invalid_id()
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
