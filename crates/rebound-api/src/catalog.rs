//! Catalog facade abstraction for the API layer.

use std::sync::Arc;

use async_trait::async_trait;
use rebound_data::{CatalogSnapshot, CatalogStore, DataResult, SnapshotHandle};

/// Trait defining the catalog backend used by the request handlers.
#[async_trait]
pub trait CatalogFacade: Send + Sync {
    /// Latest published catalog snapshot.
    async fn current(&self) -> Arc<CatalogSnapshot>;
    /// Live connectivity check against the backing database.
    async fn ping(&self) -> DataResult<()>;
}

/// Shared reference to the catalog backend.
pub type SharedCatalog = Arc<dyn CatalogFacade>;

/// Facade backed by the snapshot handle and the store that refreshes it.
pub struct LiveCatalog {
    snapshots: SnapshotHandle,
    store: CatalogStore,
}

impl LiveCatalog {
    /// Pair a snapshot handle with the store used for connectivity checks.
    #[must_use]
    pub fn new(snapshots: SnapshotHandle, store: CatalogStore) -> Self {
        Self { snapshots, store }
    }
}

#[async_trait]
impl CatalogFacade for LiveCatalog {
    async fn current(&self) -> Arc<CatalogSnapshot> {
        self.snapshots.current().await
    }

    async fn ping(&self) -> DataResult<()> {
        self.store.ping().await
    }
}
