//! Health and metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rebound_telemetry::build_sha;
use serde::Serialize;
use tracing::{error, warn};

use crate::http::{INTERNAL_ERROR_BODY, plain};
use crate::state::ApiState;

/// Health report returned to load balancers and monitoring.
#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    /// `ok` when every dependency answered, `degraded` otherwise.
    pub(crate) status: &'static str,
    /// Build identifier baked in at startup.
    pub(crate) build: String,
    /// Liveness of the catalog database.
    pub(crate) database: HealthComponent,
    /// Shape of the snapshot requests are currently resolving against.
    pub(crate) catalog: CatalogHealth,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthComponent {
    pub(crate) status: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogHealth {
    pub(crate) products: usize,
    pub(crate) aliases: usize,
    pub(crate) loaded_at: DateTime<Utc>,
}

/// Report service health. Serving continues from the in-memory snapshot even
/// while the database is unreachable, so that state reports as degraded
/// rather than down.
pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Response {
    let snapshot = state.catalog.current().await;
    let catalog = CatalogHealth {
        products: snapshot.catalog.product_count(),
        aliases: snapshot.catalog.alias_count(),
        loaded_at: snapshot.loaded_at,
    };
    let (status, body) = match state.catalog.ping().await {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                build: build_sha().to_string(),
                database: HealthComponent { status: "ok" },
                catalog,
            },
        ),
        Err(err) => {
            warn!(error = %err, "health check could not reach the catalog database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded",
                    build: build_sha().to_string(),
                    database: HealthComponent {
                        status: "unreachable",
                    },
                    catalog,
                },
            )
        }
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(value) = state.cache_control() {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}

/// Render the Prometheus exposition for all registered collectors.
pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Response {
    let body = match state.telemetry.render() {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY);
        }
    };
    match Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
    {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to build metrics response");
            plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use rebound_core::{
        LegacyClientMatcher, MirrorBases, PinningRules, ProductCatalog, RedirectEngine,
    };
    use rebound_data::{CatalogSnapshot, DataError, DataResult};
    use rebound_telemetry::Metrics;
    use serde_json::Value;

    use super::*;
    use crate::catalog::CatalogFacade;

    struct StubCatalog {
        snapshot: Arc<CatalogSnapshot>,
        reachable: bool,
    }

    impl StubCatalog {
        fn new(reachable: bool) -> Self {
            let catalog = ProductCatalog::builder()
                .alias("firefox-latest", "Firefox-43.0.1")
                .location("Firefox-43.0.1", false, "win", "/firefox/:lang/setup.exe")
                .build();
            Self {
                snapshot: Arc::new(CatalogSnapshot::new(catalog)),
                reachable,
            }
        }
    }

    #[async_trait]
    impl CatalogFacade for StubCatalog {
        async fn current(&self) -> Arc<CatalogSnapshot> {
            Arc::clone(&self.snapshot)
        }

        async fn ping(&self) -> DataResult<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(DataError::QueryFailed {
                    operation: "select 1",
                    source: sqlx::Error::PoolClosed,
                })
            }
        }
    }

    fn state(reachable: bool) -> Result<Arc<ApiState>> {
        Ok(Arc::new(ApiState::new(
            Arc::new(StubCatalog::new(reachable)),
            RedirectEngine::new(
                PinningRules::default(),
                LegacyClientMatcher::new()?,
                MirrorBases::new(None, None),
                None,
                "http://www.example.org/",
            ),
            Metrics::new()?,
            None,
            60,
        )))
    }

    async fn json_body(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn reachable_database_reports_ok() -> Result<()> {
        let response = health(State(state(true)?)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("max-age=60")
        );

        let body = json_body(response).await?;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"]["status"], "ok");
        assert_eq!(body["catalog"]["products"], 1);
        assert_eq!(body["catalog"]["aliases"], 1);
        assert!(body["catalog"]["loaded_at"].is_string());
        assert!(body["build"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_database_reports_degraded() -> Result<()> {
        let response = health(State(state(false)?)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await?;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"]["status"], "unreachable");
        // The snapshot keeps serving, so its shape still reports.
        assert_eq!(body["catalog"]["products"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_render_in_exposition_format() -> Result<()> {
        let response = metrics(State(state(true)?)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain; version=0.0.4")
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let rendered = String::from_utf8(bytes.to_vec())?;
        assert!(rendered.contains("catalog_products"));
        assert!(rendered.contains("catalog_refresh_failures_total"));
        Ok(())
    }
}
