//! Router assembly and the listening server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::Request;
use axum::routing::get;
use rebound_core::RedirectEngine;
use rebound_telemetry::{
    HEADER_REQUEST_ID, Metrics, build_sha, propagate_request_id_layer, set_request_id_layer,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::catalog::SharedCatalog;
use crate::http::bounce::bounce;
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Hosts the bounce endpoints behind request-id, tracing, and metrics layers.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the router from its shared dependencies.
    #[must_use]
    pub fn new(
        catalog: SharedCatalog,
        engine: RedirectEngine,
        telemetry: Metrics,
        pin_https_header: Option<String>,
        cache_max_age_secs: u64,
    ) -> Self {
        let state = Arc::new(ApiState::new(
            catalog,
            engine,
            telemetry.clone(),
            pin_https_header,
            cache_max_age_secs,
        ));

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path().to_string();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty,
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );

        let layered = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Router::new()
            .route("/", get(bounce))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    /// Bind the listener and serve until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound or the accept loop
    /// fails.
    pub async fn serve(self, addr: SocketAddr) -> std::io::Result<()> {
        info!("Starting bounce API on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await
    }
}
