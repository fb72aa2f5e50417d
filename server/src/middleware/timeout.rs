//! Per-request deadline middleware.
//!
//! # Design
//! The downstream call runs in its own spawned task. If the deadline passes
//! first, the client gets a 408 and the join handle is dropped. Dropping a
//! tokio join handle detaches the task rather than aborting it, so the
//! abandoned request keeps running to completion (and may still change the
//! store); its response is simply discarded. Whichever of the two futures
//! `tokio::time::timeout` observes first decides the response.
//!
//! A panic inside the spawned task is re-raised on the calling task so an
//! outer [`RecoveryLayer`](super::RecoveryLayer) sees it.

use std::convert::Infallible;
use std::panic;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::response::ApiError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TimeoutLayer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl<InnerService> Layer<InnerService> for TimeoutLayer {
    type Service = TimeoutService<InnerService>;

    fn layer(&self, inner: InnerService) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<InnerService> {
    inner: InnerService,
    timeout: Duration,
}

impl<InnerService> Service<Request> for TimeoutService<InnerService>
where
    InnerService: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    InnerService::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, context: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(context)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let timeout = self.timeout;
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let downstream = tokio::spawn(async move { inner.call(request).await });

            match tokio::time::timeout(timeout, downstream).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) if join_error.is_panic() => {
                    panic::resume_unwind(join_error.into_panic())
                }
                Ok(Err(join_error)) => Ok(ApiError::Internal(format!(
                    "request task did not complete: {join_error}"
                ))
                .into_response()),
                Err(_elapsed) => {
                    tracing::warn!(
                        %method,
                        %path,
                        timeout_ms = timeout.as_millis() as u64,
                        "request deadline exceeded; abandoning downstream task"
                    );
                    Ok(ApiError::Timeout.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::middleware::testing::ReadySlot;
    use crate::middleware::RecoveryLayer;

    fn request() -> Request {
        Request::builder().uri("/slow").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn fast_request_completes_normally() {
        let inner = service_fn(|_request: Request| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        });

        let response = TimeoutLayer::new(Duration::from_secs(5))
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn calls_the_service_that_was_polled_ready() {
        let mut service = TimeoutLayer::new(Duration::from_secs(5)).layer(ReadySlot::default());
        for _ in 0..2 {
            let response = service.ready().await.unwrap().call(request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn slow_request_gets_408() {
        let inner = service_fn(|_request: Request| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        });

        let response = TimeoutLayer::new(Duration::from_millis(20))
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn abandoned_task_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let inner = service_fn(move |_request: Request| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, Infallible>(StatusCode::OK.into_response())
            }
        });

        let response = TimeoutLayer::new(Duration::from_millis(10))
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panic_in_spawned_task_reaches_recovery() {
        let inner = service_fn(|_request: Request| async {
            if true {
                panic!("downstream exploded");
            }
            Ok::<Response, Infallible>(StatusCode::OK.into_response())
        });

        let service = RecoveryLayer::new().layer(TimeoutLayer::new(Duration::from_secs(5)).layer(inner));
        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
