//! Error types for the redirect engine.

use thiserror::Error;

use crate::mirror::MirrorScheme;

/// Primary error type for engine construction and request resolution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No mirror base is configured for the scheme the request requires.
    #[error("no mirror configured for required scheme")]
    NoMirror {
        /// Scheme the request required.
        scheme: MirrorScheme,
    },
    /// A catalog path composed into an invalid URL.
    #[error("composed redirect target is not a valid url")]
    MalformedTarget {
        /// The raw composed target.
        url: String,
        /// Source URL parse error.
        source: url::ParseError,
    },
    /// A user-agent pattern failed to compile.
    #[error("user-agent pattern failed to compile")]
    PatternCompile {
        /// Source regex compile error.
        source: regex::Error,
    },
}
