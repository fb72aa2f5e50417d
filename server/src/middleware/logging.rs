//! Request logging middleware.

use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use tower::{Layer, Service};

// =============================================================================
// LoggingLayer
// =============================================================================

/// Layer that emits one `tracing` event per request with the method, path,
/// final status and elapsed time.
///
/// The status is read from the response returned by the inner chain, so a
/// status produced by an inner layer (a recovered panic, a timeout) is the
/// one that gets logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<InnerService> Layer<InnerService> for LoggingLayer {
    type Service = LoggingService<InnerService>;

    fn layer(&self, inner: InnerService) -> Self::Service {
        LoggingService { inner }
    }
}

// =============================================================================
// LoggingService
// =============================================================================

#[derive(Debug, Clone)]
pub struct LoggingService<InnerService> {
    inner: InnerService,
}

impl<InnerService> Service<Request> for LoggingService<InnerService>
where
    InnerService: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    InnerService::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, context: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(context)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        // The readied service handles this call; the clone takes its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(request).await?;

            let status = response.status();
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            if status.is_server_error() {
                tracing::error!(%method, %path, status = status.as_u16(), elapsed_ms, "request completed");
            } else if status.is_client_error() {
                tracing::warn!(%method, %path, status = status.as_u16(), elapsed_ms, "request completed");
            } else {
                tracing::info!(%method, %path, status = status.as_u16(), elapsed_ms, "request completed");
            }

            Ok(response)
        })
    }
}
