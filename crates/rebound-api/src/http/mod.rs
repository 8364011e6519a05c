//! HTTP surface: routes, handlers, and request middleware.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Download resolution endpoint.
pub(crate) mod bounce;
/// Health and metrics endpoints.
pub(crate) mod health;
/// Router assembly and the listening server.
pub mod router;
/// Per-request metrics middleware.
pub(crate) mod telemetry;

pub(crate) const INTERNAL_ERROR_BODY: &str = "Internal Server Error.";

/// Plain-text response with the given status.
pub(crate) fn plain(status: StatusCode, body: &'static str) -> Response {
    (status, body).into_response()
}
