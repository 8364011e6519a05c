//! Download resolution endpoint.
//!
//! Thin translation layer between HTTP and [`rebound_core::RedirectEngine`]:
//! query parameters and the user agent go in, a redirect (or its plain-text
//! `print` form) comes out. Resolution failures surface as opaque 500s so a
//! misconfigured mirror never leaks detail to download clients.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, LOCATION, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use rebound_core::{Outcome, RequestParams};
use serde::Deserialize;
use tracing::error;

use crate::http::{INTERNAL_ERROR_BODY, plain};
use crate::state::ApiState;

pub(crate) const NOT_FOUND_BODY: &str = "404 page not found";

/// Query parameters accepted by the bounce endpoint. Every field is optional;
/// the engine applies the defaulting rules.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BounceQuery {
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    os: Option<String>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    print: Option<String>,
    #[serde(default)]
    attribution_code: Option<String>,
    #[serde(default)]
    attribution_sig: Option<String>,
}

impl BounceQuery {
    fn params(&self) -> RequestParams {
        RequestParams::new(
            self.product.as_deref(),
            self.os.as_deref(),
            self.lang.as_deref(),
        )
        .with_print_only(self.print.as_deref().is_some_and(|value| !value.is_empty()))
        .with_attribution(
            self.attribution_code.as_deref(),
            self.attribution_sig.as_deref(),
        )
    }
}

/// Resolve one download request to its redirect target.
pub(crate) async fn bounce(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<BounceQuery>,
    headers: HeaderMap,
) -> Response {
    let params = query.params();
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let pin_https = state.pin_https_requested(&headers);
    let snapshot = state.catalog.current().await;

    match state
        .engine
        .resolve(&snapshot.catalog, &params, user_agent, pin_https)
    {
        Ok(outcome) => {
            state.telemetry.inc_bounce_outcome(outcome_label(&outcome));
            outcome_response(outcome, state.cache_control())
        }
        Err(err) => {
            error!(error = %err, "mirror selection failed");
            state.telemetry.inc_bounce_outcome("no_mirror");
            plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
        }
    }
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Redirect {
            print_only: false, ..
        } => "redirect",
        Outcome::Redirect {
            print_only: true, ..
        } => "print",
        Outcome::Fallback { .. } => "fallback",
        Outcome::StubRedirect { .. } => "stub",
        Outcome::NotFound => "not_found",
    }
}

/// Cache headers apply to resolved outcomes only; fallback and stub redirects
/// and the 404 path always go out uncached.
fn outcome_response(outcome: Outcome, cache_control: Option<HeaderValue>) -> Response {
    match outcome {
        Outcome::Redirect {
            url,
            print_only: true,
        } => print_response(url, cache_control),
        Outcome::Redirect {
            url,
            print_only: false,
        } => redirect(&url, cache_control),
        Outcome::Fallback { url } | Outcome::StubRedirect { url } => redirect(&url, None),
        Outcome::NotFound => plain(StatusCode::NOT_FOUND, NOT_FOUND_BODY),
    }
}

fn print_response(url: String, cache_control: Option<HeaderValue>) -> Response {
    let mut response = (StatusCode::OK, url).into_response();
    if let Some(value) = cache_control {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}

fn redirect(url: &str, cache_control: Option<HeaderValue>) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => {
            let mut response = StatusCode::FOUND.into_response();
            let headers = response.headers_mut();
            headers.insert(LOCATION, location);
            if let Some(value) = cache_control {
                headers.insert(CACHE_CONTROL, value);
            }
            response
        }
        Err(err) => {
            error!(error = %err, url, "redirect target rejected as a header value");
            plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
        }
    }
}
