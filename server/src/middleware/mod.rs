//! Cross-cutting request middleware.
//!
//! - [`logging`]: one structured log event per request
//! - [`recovery`]: panic backstop producing a 500
//! - [`timeout`]: per-request deadline producing a 408

pub mod logging;
pub mod recovery;
pub mod timeout;

use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;

pub use logging::LoggingLayer;
pub use recovery::RecoveryLayer;
pub use timeout::{TimeoutLayer, DEFAULT_REQUEST_TIMEOUT};

/// Wraps `router` in the chain Logging → Recovery → Timeout, outermost first.
pub fn apply(router: Router, request_timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(LoggingLayer::new())
            .layer(RecoveryLayer::new())
            .layer(TimeoutLayer::new(request_timeout)),
    )
}
