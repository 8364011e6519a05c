//! Request resolution state machine.

use tracing::debug;
use url::Url;

use crate::catalog::ProductCatalog;
use crate::error::EngineError;
use crate::mirror::MirrorBases;
use crate::pinning::PinningRules;
use crate::stub;
use crate::useragent::LegacyClientMatcher;

/// OS bucket assumed when a request does not name one; also the only bucket
/// eligible for legacy pinning.
pub const DEFAULT_OS: &str = "win";

/// Language assumed when a request does not name one.
pub const DEFAULT_LANG: &str = "en-US";

/// Parsed query parameters of one download request.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    product: Option<String>,
    os: Option<String>,
    lang: Option<String>,
    print_only: bool,
    attribution_code: Option<String>,
    attribution_sig: Option<String>,
}

impl RequestParams {
    /// Builds parameters from raw query values. `product` and `os` are
    /// trimmed and lower-cased; `lang` is kept as supplied. Empty values
    /// count as absent.
    #[must_use]
    pub fn new(product: Option<&str>, os: Option<&str>, lang: Option<&str>) -> Self {
        Self {
            product: normalized(product),
            os: normalized(os),
            lang: lang
                .map(ToString::to_string)
                .filter(|lang| !lang.is_empty()),
            ..Self::default()
        }
    }

    /// Requests the resolved URL as a plain-text body instead of a redirect.
    #[must_use]
    pub const fn with_print_only(mut self, print_only: bool) -> Self {
        self.print_only = print_only;
        self
    }

    /// Attaches the attribution fields consumed by the stub gate.
    #[must_use]
    pub fn with_attribution(mut self, code: Option<&str>, sig: Option<&str>) -> Self {
        self.attribution_code = code.map(ToString::to_string);
        self.attribution_sig = sig.map(ToString::to_string);
        self
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

/// Request after defaulting, legacy detection, and pinning. Immutable; the
/// later stages read it and never write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRequest {
    /// Product identifier actually looked up, post-pinning.
    pub product: String,
    /// OS bucket, defaulted when the request named none.
    pub os: String,
    /// Language tag, defaulted when the request named none.
    pub lang: String,
    /// Whether the user agent identifies an end-of-life Windows client.
    pub is_legacy: bool,
    /// Whether pinning rewrote the product identifier.
    pub pinned: bool,
}

/// Terminal result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Mirror redirect target.
    Redirect {
        /// Fully composed mirror URL.
        url: String,
        /// Return the URL as a plain-text body instead of redirecting.
        print_only: bool,
    },
    /// Bare request diverted to the landing site.
    Fallback {
        /// Configured landing URL.
        url: String,
    },
    /// Request diverted to the attribution service.
    StubRedirect {
        /// Attribution-service URL with the canonical query string.
        url: String,
    },
    /// Product or OS bucket absent from the catalog.
    NotFound,
}

/// Per-request resolution pipeline.
///
/// Holds only injected configuration; every request resolves against a
/// caller-supplied catalog snapshot, so the engine is safe for unbounded
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct RedirectEngine {
    rules: PinningRules,
    matcher: LegacyClientMatcher,
    mirrors: MirrorBases,
    stub_root: Option<String>,
    fallback_url: String,
}

impl RedirectEngine {
    /// Wires the engine from its injected parts.
    #[must_use]
    pub fn new(
        rules: PinningRules,
        matcher: LegacyClientMatcher,
        mirrors: MirrorBases,
        stub_root: Option<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            matcher,
            mirrors,
            stub_root: stub_root.filter(|root| !root.is_empty()),
            fallback_url: fallback_url.into(),
        }
    }

    /// Applies defaulting, legacy detection, and pinning to raw parameters.
    #[must_use]
    pub fn effective_request(&self, params: &RequestParams, user_agent: &str) -> EffectiveRequest {
        let product = params.product.clone().unwrap_or_default();
        let os = params
            .os
            .clone()
            .unwrap_or_else(|| DEFAULT_OS.to_string());
        let lang = params
            .lang
            .clone()
            .unwrap_or_else(|| DEFAULT_LANG.to_string());
        let is_legacy = self.matcher.is_legacy(user_agent);
        let (product, pinned) = if os == DEFAULT_OS && is_legacy {
            let pinned_product = self.rules.pin_product(&product);
            let pinned = pinned_product != product;
            (pinned_product, pinned)
        } else {
            (product, false)
        };
        EffectiveRequest {
            product,
            os,
            lang,
            is_legacy,
            pinned,
        }
    }

    /// Resolves one request to its terminal outcome.
    ///
    /// # Errors
    ///
    /// Fails when no mirror is configured for the scheme the request
    /// requires, or when a catalog path composes into an invalid URL. Both
    /// are configuration errors for that request only.
    pub fn resolve(
        &self,
        catalog: &ProductCatalog,
        params: &RequestParams,
        user_agent: &str,
        pin_https: bool,
    ) -> Result<Outcome, EngineError> {
        if params.product.is_none() {
            return Ok(Outcome::Fallback {
                url: self.fallback_url.clone(),
            });
        }
        let effective = self.effective_request(params, user_agent);
        if effective.pinned {
            debug!(product = %effective.product, "pinned product for legacy client");
        }
        if let Some(url) = stub::divert_target(
            self.stub_root.as_deref(),
            params.attribution_code.as_deref(),
            params.attribution_sig.as_deref(),
            &effective.lang,
            &effective.os,
            &effective.product,
            effective.is_legacy,
        ) {
            return Ok(Outcome::StubRedirect { url });
        }
        let Some(found) = catalog.resolve(&effective.product, &effective.os) else {
            return Ok(Outcome::NotFound);
        };
        let base = self.mirrors.base_url(pin_https || found.ssl_only)?;
        let url = compose_target(&base, &found.template.render(&effective.lang))?;
        Ok(Outcome::Redirect {
            url,
            print_only: params.print_only,
        })
    }
}

/// Joins a mirror base with a rendered path and normalizes the result through
/// a URL parse, which percent-encodes characters (installer names contain
/// spaces) that may not appear raw.
fn compose_target(base: &str, path: &str) -> Result<String, EngineError> {
    let raw = format!("{base}{path}");
    match Url::parse(&raw) {
        Ok(url) => Ok(url.to_string()),
        Err(source) => Err(EngineError::MalformedTarget { url: raw, source }),
    }
}
