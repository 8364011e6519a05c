#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven configuration for the Rebound workspace.
//!
//! Layout: `settings.rs` (typed [`Settings`] resolved from `REBOUND_*`
//! variables), `error.rs` (validation failures).

pub mod error;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::Settings;
