//! Product and alias lookup tables.

use std::collections::HashMap;

const LANG_PLACEHOLDER: &str = ":lang";

/// Lower-cased lookup key shared by the alias and product tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasName(String);

impl AliasName {
    /// Normalizes a raw product identifier for lookup.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// The normalized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Product identifier as stored in the catalog, case preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductName(String);

impl ProductName {
    /// Wraps a stored product name.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The stored form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Operating-system bucket tag, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OsName(String);

impl OsName {
    /// Normalizes a raw OS tag.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// The normalized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Path template with a `:lang` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTemplate(String);

impl LocationTemplate {
    /// Wraps a stored path template.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Renders the template for a language tag. Pure substitution; the engine
    /// percent-encodes the composed URL afterwards.
    #[must_use]
    pub fn render(&self, lang: &str) -> String {
        self.0.replace(LANG_PLACEHOLDER, lang)
    }

    /// The raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
struct ProductEntry {
    ssl_only: bool,
    by_os: HashMap<OsName, LocationTemplate>,
}

/// Outcome of a successful catalog lookup.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLocation<'a> {
    /// Path template for the requested OS bucket.
    pub template: &'a LocationTemplate,
    /// Whether the product must only ever be served over HTTPS.
    pub ssl_only: bool,
}

/// Immutable snapshot of the alias and product tables.
///
/// Lookups normalize the queried identifier the same way keys were normalized
/// at build time, which is what makes product names case-insensitive at
/// lookup while staying case-preserving in storage.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    aliases: HashMap<AliasName, ProductName>,
    products: HashMap<AliasName, ProductEntry>,
}

impl ProductCatalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Resolves a product identifier and OS tag to a location template.
    ///
    /// The identifier is normalized and run through the alias table first;
    /// the resolved name is then looked up in the product table.
    #[must_use]
    pub fn resolve(&self, product: &str, os: &str) -> Option<ResolvedLocation<'_>> {
        let mut key = AliasName::new(product);
        if let Some(target) = self.aliases.get(&key) {
            key = AliasName::new(target.as_str());
        }
        let entry = self.products.get(&key)?;
        let template = entry.by_os.get(&OsName::new(os))?;
        Some(ResolvedLocation {
            template,
            ssl_only: entry.ssl_only,
        })
    }

    /// Number of products with at least one location.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Number of alias entries.
    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

/// Incremental [`ProductCatalog`] construction, one row at a time.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: ProductCatalog,
}

impl CatalogBuilder {
    /// Adds an alias row.
    #[must_use]
    pub fn alias(mut self, alias: &str, product: &str) -> Self {
        self.catalog
            .aliases
            .insert(AliasName::new(alias), ProductName::new(product));
        self
    }

    /// Adds one product/OS/path row. Repeated rows for the same product
    /// accumulate OS buckets; the last `ssl_only` value wins.
    #[must_use]
    pub fn location(mut self, product: &str, ssl_only: bool, os: &str, path: &str) -> Self {
        let entry = self
            .catalog
            .products
            .entry(AliasName::new(product))
            .or_default();
        entry.ssl_only = ssl_only;
        entry
            .by_os
            .insert(OsName::new(os), LocationTemplate::new(path));
        self
    }

    /// Finishes the catalog.
    #[must_use]
    pub fn build(self) -> ProductCatalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProductCatalog {
        ProductCatalog::builder()
            .alias("firefox-latest", "Firefox-43.0.1")
            .alias("firefox-43.0.1-ssl", "Firefox-43.0.1-SSL")
            .location(
                "Firefox-43.0.1",
                false,
                "win",
                "/firefox/releases/43.0.1/win32/:lang/Firefox Setup 43.0.1.exe",
            )
            .location(
                "Firefox-43.0.1",
                false,
                "osx",
                "/firefox/releases/43.0.1/mac/:lang/Firefox 43.0.1.dmg",
            )
            .location(
                "Firefox-43.0.1-SSL",
                true,
                "win",
                "/firefox/releases/43.0.1/win32/:lang/Firefox Setup 43.0.1.exe",
            )
            .build()
    }

    #[test]
    fn resolves_direct_products_case_insensitively() {
        let catalog = sample();
        let found = catalog
            .resolve("Firefox-43.0.1", "win")
            .expect("direct lookup");
        assert!(!found.ssl_only);
        let found = catalog
            .resolve("firefox-43.0.1", "WIN")
            .expect("normalized lookup");
        assert!(found.template.as_str().contains("win32"));
    }

    #[test]
    fn resolves_aliases_before_products() {
        let catalog = sample();
        let found = catalog.resolve("firefox-latest", "osx").expect("alias");
        assert!(found.template.as_str().contains("/mac/"));
        let found = catalog
            .resolve("FIREFOX-43.0.1-SSL", "win")
            .expect("ssl alias");
        assert!(found.ssl_only);
    }

    #[test]
    fn missing_product_or_os_is_none() {
        let catalog = sample();
        assert!(catalog.resolve("firefox-1.0", "win").is_none());
        assert!(catalog.resolve("firefox-43.0.1", "linux64").is_none());
        assert!(catalog.resolve("", "win").is_none());
    }

    #[test]
    fn render_substitutes_every_language_occurrence() {
        let template = LocationTemplate::new("/pub/:lang/installer-:lang.exe");
        assert_eq!(
            template.render("en-US"),
            "/pub/en-US/installer-en-US.exe"
        );
    }

    #[test]
    fn counts_reflect_rows() {
        let catalog = sample();
        assert_eq!(catalog.product_count(), 2);
        assert_eq!(catalog.alias_count(), 2);
    }
}
