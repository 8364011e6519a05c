//! HTTP surface for the bounce service: router, handlers, and the catalog
//! facade the handlers resolve against.

/// Catalog facade abstraction and its live implementation.
pub mod catalog;
/// Routers, handlers, and HTTP middleware.
pub mod http;
/// Shared application state for the handlers.
pub(crate) mod state;

pub use catalog::{CatalogFacade, LiveCatalog, SharedCatalog};
pub use http::router::ApiServer;
