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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Catalog access layer for Rebound: mirror products, locations, and aliases.

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::{DataError, Result as DataResult};
pub use snapshot::{CatalogSnapshot, SnapshotHandle};
pub use store::{CatalogStore, CatalogWatcher};
