//! Panic recovery middleware.

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use tower::{Layer, Service};

use crate::response::ApiError;

/// Layer that turns a panic anywhere downstream into a 500 response.
///
/// This is a backstop only. Handlers report failures as values; a panic here
/// means a bug, and the serving task must survive it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryLayer;

impl RecoveryLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<InnerService> Layer<InnerService> for RecoveryLayer {
    type Service = RecoveryService<InnerService>;

    fn layer(&self, inner: InnerService) -> Self::Service {
        RecoveryService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryService<InnerService> {
    inner: InnerService,
}

impl<InnerService> Service<Request> for RecoveryService<InnerService>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        // The call itself sits inside the guarded future so a panic while
        // building the inner future is caught too.
        let guarded = AssertUnwindSafe(async move { inner.call(request).await }).catch_unwind();

        Box::pin(async move {
            match guarded.await {
                Ok(result) => result,
                Err(payload) => {
                    tracing::error!(panic = %panic_message(payload.as_ref()), "recovered from panic");
                    Ok(ApiError::Internal("handler panicked".to_string()).into_response())
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
