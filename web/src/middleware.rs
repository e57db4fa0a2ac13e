//! Correlation-id middleware.
//!
//! Every request gets an `X-Correlation-ID`: the caller's, if it is a valid
//! UUID, or a fresh one. The id is stored in request extensions as
//! [`CorrelationId`], recorded on an `http_request` tracing span wrapping the
//! handler, and echoed on the response.

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    fn from_request(req: &Request) -> Self {
        Self(
            req.headers()
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4),
        )
    }
}

/// Create the correlation-id layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = CorrelationId::from_request(&req);
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id.0,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(value) = HeaderValue::from_str(&correlation_id.0.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(id): Extension<CorrelationId>| async move { id.0.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    fn header_of(response: &Response) -> String {
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn test_generated_when_missing() {
        let request = http::Request::builder().uri("/echo").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert!(Uuid::parse_str(&header_of(&response)).is_ok());
    }

    #[tokio::test]
    async fn test_caller_id_is_kept_and_visible_to_handlers() {
        let id = Uuid::new_v4();
        let request = http::Request::builder()
            .uri("/echo")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(header_of(&response), id.to_string());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_id_is_replaced() {
        let request = http::Request::builder()
            .uri("/echo")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let header = header_of(&response);
        assert_ne!(header, "not-a-uuid");
        assert!(Uuid::parse_str(&header).is_ok());
    }
}
