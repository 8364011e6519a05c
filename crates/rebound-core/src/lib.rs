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

//! Download-request resolution: alias lookup, legacy channel pinning, mirror
//! scheme selection, and stub-attribution diversion.
//!
//! Layout: `version.rs` (lenient dotted-version comparison), `useragent.rs`
//! (end-of-life Windows detection), `pinning.rs` (channel ceilings and suffix
//! classification), `catalog.rs` (product/alias tables), `mirror.rs` (base URL
//! selection), `engine.rs` (the per-request state machine).

pub mod catalog;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod pinning;
mod stub;
pub mod useragent;
pub mod version;

pub use catalog::{
    AliasName, CatalogBuilder, LocationTemplate, OsName, ProductCatalog, ProductName,
    ResolvedLocation,
};
pub use engine::{
    DEFAULT_LANG, DEFAULT_OS, EffectiveRequest, Outcome, RedirectEngine, RequestParams,
};
pub use error::EngineError;
pub use mirror::{MirrorBases, MirrorScheme};
pub use pinning::{Channel, ChannelCeilings, PinningRules, SuffixKind, classify_suffix};
pub use useragent::{LEGACY_WINDOWS_PATTERN, LegacyClientMatcher};
pub use version::compare_versions;
