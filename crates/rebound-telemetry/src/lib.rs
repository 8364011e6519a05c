//! Telemetry primitives shared across the Rebound workspace.
//!
//! This crate centralises logging, metrics, and request-context helpers so the
//! application and delivery surfaces can adopt a consistent observability story.
//!
//! Layout: `init.rs` (logging setup and build metadata), `metrics.rs`
//! (Prometheus registry), `context.rs` (request context propagation),
//! `layers.rs` (request-id middleware), `error.rs` (failure types).

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{GlobalContextGuard, current_request_id, current_route, with_request_context};
pub use error::{Result as TelemetryResult, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_name,
};
pub use layers::{HEADER_REQUEST_ID, propagate_request_id_layer, set_request_id_layer};
pub use metrics::{Metrics, MetricsSnapshot};
