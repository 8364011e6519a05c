//! Shared application state handed to every handler.

use axum::http::{HeaderMap, HeaderValue};
use rebound_core::RedirectEngine;
use rebound_telemetry::Metrics;

use crate::catalog::SharedCatalog;

/// Dependencies the handlers resolve against, wired once at router build time.
pub(crate) struct ApiState {
    pub(crate) catalog: SharedCatalog,
    pub(crate) engine: RedirectEngine,
    pub(crate) telemetry: Metrics,
    pin_https_header: Option<String>,
    cache_max_age_secs: u64,
}

impl ApiState {
    pub(crate) fn new(
        catalog: SharedCatalog,
        engine: RedirectEngine,
        telemetry: Metrics,
        pin_https_header: Option<String>,
        cache_max_age_secs: u64,
    ) -> Self {
        Self {
            catalog,
            engine,
            telemetry,
            pin_https_header: pin_https_header.filter(|name| !name.is_empty()),
            cache_max_age_secs,
        }
    }

    /// Whether the configured pin header is present with the exact value
    /// `https`. Always false when no header name is configured.
    pub(crate) fn pin_https_requested(&self, headers: &HeaderMap) -> bool {
        self.pin_https_header.as_deref().is_some_and(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value == "https")
        })
    }

    /// `Cache-Control` value for resolved responses, or `None` when response
    /// caching is disabled.
    pub(crate) fn cache_control(&self) -> Option<HeaderValue> {
        if self.cache_max_age_secs == 0 {
            return None;
        }
        HeaderValue::try_from(format!("max-age={}", self.cache_max_age_secs)).ok()
    }
}
