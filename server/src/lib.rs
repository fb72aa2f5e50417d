//! In-memory todo service over HTTP.
//!
//! # Overview
//! Requests pass through the middleware chain (logging, panic recovery,
//! per-request timeout), the axum router in [`routes`], the use cases in
//! [`service`], and finally the storage engine in [`store`].
//!
//! # Design
//! - The store is an owned value handed to the service at startup, so tests
//!   can run any number of isolated instances side by side.
//! - The service depends on the [`TodoStore`] trait only.
//! - Domain failures are values ([`TodoError`]); [`response::ApiError`] is the
//!   single place they become HTTP statuses.

pub mod config;
pub mod error;
pub mod middleware;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod store;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub use config::ServerConfig;
pub use error::TodoError;
pub use model::Todo;
pub use service::TodoService;
pub use store::{InMemoryTodoStore, TodoStore};

/// Full application over a fresh in-memory store with the default timeout.
pub fn app() -> Router {
    build_app(
        TodoService::new(Arc::new(InMemoryTodoStore::new())),
        middleware::DEFAULT_REQUEST_TIMEOUT,
    )
}

/// Routes for `service` wrapped in the middleware chain.
pub fn build_app(service: TodoService, request_timeout: Duration) -> Router {
    middleware::apply(routes::router(service), request_timeout)
}

/// Serves a fresh application on `listener` until the process exits.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, &ServerConfig::default(), std::future::pending()).await
}

/// Serves a fresh application on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = TodoService::new(Arc::new(InMemoryTodoStore::new()));
    let router = build_app(service, config.request_timeout);
    serve_router(listener, router, config.shutdown_grace, shutdown).await
}

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// After the signal the listener stops accepting and in-flight requests get
/// `shutdown_grace` to finish. When the grace period runs out the server task
/// is aborted and this returns; connections still open are dropped with it.
pub async fn serve_router<F>(
    listener: TcpListener,
    router: Router,
    shutdown_grace: Duration,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = draining_tx.send(());
            })
            .into_future(),
    );

    // The sender is only dropped unsent when the server stopped on its own.
    if draining_rx.await.is_err() {
        return server.await.map_err(std::io::Error::other)?;
    }
    tracing::info!(
        grace_ms = shutdown_grace.as_millis() as u64,
        "shutdown requested; draining in-flight requests"
    );

    match tokio::time::timeout(shutdown_grace, &mut server).await {
        Ok(joined) => joined.map_err(std::io::Error::other)?,
        Err(_) => {
            tracing::warn!("grace period elapsed; closing remaining connections");
            server.abort();
            Ok(())
        }
    }
}
