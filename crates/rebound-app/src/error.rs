//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration loading failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: rebound_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: rebound_telemetry::TelemetryError,
    },
    /// Catalog access failed.
    #[error("catalog access failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source catalog error.
        source: rebound_data::DataError,
    },
    /// Redirect engine construction failed.
    #[error("redirect engine construction failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        source: rebound_core::EngineError,
    },
    /// HTTP listener operations failed.
    #[error("http listener operation failed")]
    Serve {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: rebound_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: rebound_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn data(operation: &'static str, source: rebound_data::DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn engine(operation: &'static str, source: rebound_core::EngineError) -> Self {
        Self::Engine { operation, source }
    }

    pub(crate) const fn serve(operation: &'static str, source: io::Error) -> Self {
        Self::Serve { operation, source }
    }
}
