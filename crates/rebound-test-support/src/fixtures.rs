//! Mirror catalog schema and seed rows for integration tests.

use anyhow::Result;

use crate::postgres::run_statements;

const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS mirror_products (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        ssl_only BOOLEAN NOT NULL DEFAULT FALSE
    )",
    r"CREATE TABLE IF NOT EXISTS mirror_os (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    r"CREATE TABLE IF NOT EXISTS mirror_locations (
        id SERIAL PRIMARY KEY,
        product_id INTEGER NOT NULL REFERENCES mirror_products (id),
        os_id INTEGER NOT NULL REFERENCES mirror_os (id),
        path TEXT NOT NULL,
        UNIQUE (product_id, os_id)
    )",
    r"CREATE TABLE IF NOT EXISTS mirror_aliases (
        id SERIAL PRIMARY KEY,
        alias TEXT NOT NULL UNIQUE,
        related_product TEXT NOT NULL
    )",
];

/// A product/OS location row to seed into the catalog.
#[derive(Debug, Clone, Copy)]
pub struct SeedLocation<'a> {
    /// Product name exactly as stored, e.g. `Firefox-43.0.1`.
    pub product: &'a str,
    /// Whether the product must only be served over HTTPS.
    pub ssl_only: bool,
    /// OS bucket, e.g. `win` or `osx`.
    pub os: &'a str,
    /// Path template, optionally containing the `:lang` placeholder.
    pub path: &'a str,
}

/// An alias row pointing at a concrete product.
#[derive(Debug, Clone, Copy)]
pub struct SeedAlias<'a> {
    /// Alias name, e.g. `firefox-latest`.
    pub alias: &'a str,
    /// Product the alias resolves to.
    pub product: &'a str,
}

/// Create the catalog tables without seeding any rows.
///
/// # Errors
///
/// Returns an error if a schema statement fails to execute.
pub fn apply_catalog_schema(url: &str) -> Result<()> {
    run_statements(url, SCHEMA.iter().map(ToString::to_string).collect())
}

/// Drop the catalog tables, for tests that exercise load failures.
///
/// # Errors
///
/// Returns an error if a drop statement fails to execute.
pub fn drop_catalog_schema(url: &str) -> Result<()> {
    // Locations reference products and os rows, so they go first.
    run_statements(
        url,
        vec![
            "DROP TABLE IF EXISTS mirror_locations".to_string(),
            "DROP TABLE IF EXISTS mirror_aliases".to_string(),
            "DROP TABLE IF EXISTS mirror_products".to_string(),
            "DROP TABLE IF EXISTS mirror_os".to_string(),
        ],
    )
}

/// Create the catalog tables and seed the supplied rows.
///
/// Re-seeding an existing product, location, or alias updates it in place, so
/// tests can layer fixtures on top of each other.
///
/// # Errors
///
/// Returns an error if any statement fails to execute.
pub fn seed_catalog(
    url: &str,
    locations: &[SeedLocation<'_>],
    aliases: &[SeedAlias<'_>],
) -> Result<()> {
    run_statements(url, seed_statements(locations, aliases))
}

fn seed_statements(locations: &[SeedLocation<'_>], aliases: &[SeedAlias<'_>]) -> Vec<String> {
    let mut statements: Vec<String> = SCHEMA.iter().map(ToString::to_string).collect();

    for location in locations {
        statements.push(format!(
            "INSERT INTO mirror_products (name, ssl_only) VALUES ({}, {}) \
             ON CONFLICT (name) DO UPDATE SET ssl_only = EXCLUDED.ssl_only",
            quote(location.product),
            location.ssl_only,
        ));
        statements.push(format!(
            "INSERT INTO mirror_os (name) VALUES ({}) ON CONFLICT (name) DO NOTHING",
            quote(location.os),
        ));
        statements.push(format!(
            "INSERT INTO mirror_locations (product_id, os_id, path) \
             SELECT mirror_products.id, mirror_os.id, {} \
             FROM mirror_products, mirror_os \
             WHERE mirror_products.name = {} AND mirror_os.name = {} \
             ON CONFLICT (product_id, os_id) DO UPDATE SET path = EXCLUDED.path",
            quote(location.path),
            quote(location.product),
            quote(location.os),
        ));
    }

    for alias in aliases {
        statements.push(format!(
            "INSERT INTO mirror_aliases (alias, related_product) VALUES ({}, {}) \
             ON CONFLICT (alias) DO UPDATE SET related_product = EXCLUDED.related_product",
            quote(alias.alias),
            quote(alias.product),
        ));
    }

    statements
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
