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

//! Database-backed loading of the mirror catalog.

use std::time::Duration;

use rebound_core::ProductCatalog;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tokio::time::sleep;
use tracing::instrument;

use crate::error::{DataError, Result};
use crate::snapshot::CatalogSnapshot;

const SELECT_LOCATIONS: &str = r"
    SELECT mirror_products.name AS product,
           mirror_products.ssl_only,
           mirror_os.name AS os,
           mirror_locations.path
    FROM mirror_locations
    INNER JOIN mirror_products ON mirror_products.id = mirror_locations.product_id
    INNER JOIN mirror_os ON mirror_os.id = mirror_locations.os_id
";

const SELECT_ALIASES: &str = r"SELECT alias, related_product FROM mirror_aliases";

const PING: &str = r"SELECT 1";

fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::QueryFailed { operation, source }
}

#[derive(Debug, Clone, FromRow)]
struct LocationRow {
    product: String,
    ssl_only: bool,
    os: String,
    path: String,
}

#[derive(Debug, Clone, FromRow)]
struct AliasRow {
    alias: String,
    related_product: String,
}

/// Database-backed repository for the mirror catalog.
#[derive(Clone)]
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// Establish a connection pool against the catalog database.
    ///
    /// # Errors
    ///
    /// Returns an error if the `PostgreSQL` connection cannot be established.
    #[instrument(name = "catalog_store.new", skip(database_url))]
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|source| DataError::ConnectFailed { source })?;

        Ok(Self { pool })
    }

    /// Load a fresh snapshot of products, locations, and aliases.
    ///
    /// # Errors
    ///
    /// Returns an error if either catalog query fails.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let locations = sqlx::query_as::<_, LocationRow>(SELECT_LOCATIONS)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("load mirror locations"))?;
        let aliases = sqlx::query_as::<_, AliasRow>(SELECT_ALIASES)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("load mirror aliases"))?;

        Ok(CatalogSnapshot::new(assemble(&locations, &aliases)))
    }

    /// Verify the database connection is healthy.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe query fails.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query(PING)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("ping"))?;
        Ok(())
    }

    /// Load an initial snapshot and a watcher that reloads on an interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshot cannot be loaded.
    pub async fn watch(
        &self,
        refresh_interval: Duration,
    ) -> Result<(CatalogSnapshot, CatalogWatcher)> {
        let snapshot = self.snapshot().await?;
        let watcher = CatalogWatcher {
            store: self.clone(),
            refresh_interval,
        };
        Ok((snapshot, watcher))
    }
}

/// Periodic reloader producing fresh catalog snapshots.
pub struct CatalogWatcher {
    store: CatalogStore,
    refresh_interval: Duration,
}

impl CatalogWatcher {
    /// Wait until the next reload is due.
    pub async fn tick(&self) {
        sleep(self.refresh_interval).await;
    }

    /// Load a fresh snapshot immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the reload query fails; the caller decides whether
    /// to keep serving the previous snapshot.
    pub async fn reload(&self) -> Result<CatalogSnapshot> {
        self.store.snapshot().await
    }
}

fn assemble(locations: &[LocationRow], aliases: &[AliasRow]) -> ProductCatalog {
    let mut builder = ProductCatalog::builder();
    for row in locations {
        builder = builder.location(&row.product, row.ssl_only, &row.os, &row.path);
    }
    for row in aliases {
        builder = builder.alias(&row.alias, &row.related_product);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(product: &str, ssl_only: bool, os: &str, path: &str) -> LocationRow {
        LocationRow {
            product: product.to_string(),
            ssl_only,
            os: os.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn assemble_builds_a_resolvable_catalog() {
        let locations = [
            location(
                "Firefox-43.0.1",
                false,
                "win",
                "/firefox/releases/43.0.1/win32/:lang/installer.exe",
            ),
            location(
                "Firefox-43.0.1",
                false,
                "osx",
                "/firefox/releases/43.0.1/mac/:lang/installer.dmg",
            ),
            location(
                "Firefox-43.0.1-SSL",
                true,
                "win",
                "/firefox/releases/43.0.1/win32/:lang/installer.exe",
            ),
        ];
        let aliases = [AliasRow {
            alias: "firefox-latest".to_string(),
            related_product: "Firefox-43.0.1".to_string(),
        }];

        let catalog = assemble(&locations, &aliases);

        assert_eq!(catalog.product_count(), 2);
        assert_eq!(catalog.alias_count(), 1);

        let direct = catalog.resolve("firefox-43.0.1", "osx");
        assert!(direct.is_some_and(|found| !found.ssl_only));

        let pinned = catalog.resolve("firefox-43.0.1-ssl", "win");
        assert!(pinned.is_some_and(|found| found.ssl_only));

        let aliased = catalog.resolve("firefox-latest", "win");
        assert!(aliased.is_some());
    }

    #[test]
    fn assemble_tolerates_an_empty_catalog() {
        let catalog = assemble(&[], &[]);

        assert_eq!(catalog.product_count(), 0);
        assert_eq!(catalog.alias_count(), 0);
        assert!(catalog.resolve("firefox-43.0.1", "win").is_none());
    }
}
