//! Per-request metrics middleware.
//!
//! Counts every finished request by matched route and status code, and scopes
//! the request id and route into task-local context so log lines emitted by
//! the handlers can pick them up.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use rebound_telemetry::{HEADER_REQUEST_ID, Metrics, with_request_context};
use tower::{Layer, Service};

/// Layer that wraps the router with [`HttpMetricsService`].
#[derive(Clone)]
pub(crate) struct HttpMetricsLayer {
    telemetry: Metrics,
}

impl HttpMetricsLayer {
    pub(crate) const fn new(telemetry: Metrics) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

/// Service that records one `http_requests_total` sample per response.
#[derive(Clone)]
pub(crate) struct HttpMetricsService<S> {
    inner: S,
    telemetry: Metrics,
}

impl<S, B> Service<Request<B>> for HttpMetricsService<S>
where
    S: Service<Request<B>, Response = axum::response::Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let route = req.extensions().get::<MatchedPath>().map_or_else(
            || req.uri().path().to_string(),
            |matched| matched.as_str().to_string(),
        );
        let request_id = req
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let telemetry = self.telemetry.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            with_request_context(request_id, route.clone(), async move {
                let response = fut.await?;
                telemetry.inc_http_request(&route, response.status().as_u16());
                Ok(response)
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use anyhow::Result;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::Response;
    use rebound_telemetry::current_route;

    use super::*;

    #[derive(Clone)]
    struct EchoRoute;

    impl Service<Request<Body>> for EchoRoute {
        type Response = Response;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            // Read the route lazily so the task-local scope is observable.
            Box::pin(async {
                let body = current_route().unwrap_or_default();
                Ok(Response::new(Body::from(body)))
            })
        }
    }

    #[tokio::test]
    async fn records_route_and_status_for_each_response() -> Result<()> {
        let telemetry = Metrics::new()?;
        let mut service = HttpMetricsLayer::new(telemetry.clone()).layer(EchoRoute);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())?;
        let response = service.call(request).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"/health");

        let rendered = telemetry.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("route=\"/health\""));
        assert!(rendered.contains("code=\"200\""));
        Ok(())
    }
}
