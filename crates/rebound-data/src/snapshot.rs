//! In-memory catalog snapshots shared between the refresh loop and request handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rebound_core::ProductCatalog;
use tokio::sync::RwLock;

/// Point-in-time view of the mirror catalog.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Resolved product, location, and alias tables.
    pub catalog: ProductCatalog,
    /// Instant the snapshot was loaded from the database.
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Wrap a freshly loaded catalog with the current timestamp.
    #[must_use]
    pub fn new(catalog: ProductCatalog) -> Self {
        Self {
            catalog,
            loaded_at: Utc::now(),
        }
    }
}

/// Shared handle that lets request handlers read the latest snapshot while the
/// refresh loop swaps new ones in behind it.
#[derive(Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<CatalogSnapshot>>>,
}

impl SnapshotHandle {
    /// Create a handle seeded with an initial snapshot.
    #[must_use]
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Latest published snapshot.
    pub async fn current(&self) -> Arc<CatalogSnapshot> {
        self.inner.read().await.clone()
    }

    /// Publish a new snapshot, replacing the previous one.
    pub async fn replace(&self, snapshot: CatalogSnapshot) {
        *self.inner.write().await = Arc::new(snapshot);
    }
}
