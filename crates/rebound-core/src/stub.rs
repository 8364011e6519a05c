//! Stub-installer attribution diversion.

use url::form_urlencoded;

const STUB_MARKER: &str = "-stub";

/// Returns the attribution-service target for a request that qualifies for
/// diversion, or `None` when any gate condition fails: the stub root must be
/// configured, both attribution fields non-empty, the product a stub
/// installer, and the client not legacy (legacy clients need the pinning
/// path instead).
///
/// Query keys are appended in sorted order so the encoding is canonical.
pub(crate) fn divert_target(
    root: Option<&str>,
    code: Option<&str>,
    sig: Option<&str>,
    lang: &str,
    os: &str,
    product: &str,
    is_legacy: bool,
) -> Option<String> {
    let root = root.filter(|root| !root.is_empty())?;
    let code = code.filter(|code| !code.is_empty())?;
    let sig = sig.filter(|sig| !sig.is_empty())?;
    if is_legacy || !product.contains(STUB_MARKER) {
        return None;
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("attribution_code", code)
        .append_pair("attribution_sig", sig)
        .append_pair("lang", lang)
        .append_pair("os", os)
        .append_pair("product", product)
        .finish();
    Some(format!("{root}?{query}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://attribution.example.net/builds";

    fn divert(product: &str, is_legacy: bool) -> Option<String> {
        divert_target(
            Some(ROOT),
            Some("code=123"),
            Some("sig-abc"),
            "en-US",
            "win",
            product,
            is_legacy,
        )
    }

    #[test]
    fn diverts_stub_products_with_attribution() {
        let url = divert("firefox-stub", false).expect("divert");
        assert_eq!(
            url,
            "https://attribution.example.net/builds?attribution_code=code%3D123&attribution_sig=sig-abc&lang=en-US&os=win&product=firefox-stub"
        );
    }

    #[test]
    fn legacy_clients_are_never_diverted() {
        assert!(divert("firefox-stub", true).is_none());
    }

    #[test]
    fn non_stub_products_are_never_diverted() {
        assert!(divert("firefox-latest", false).is_none());
    }

    #[test]
    fn every_gate_input_is_required() {
        assert!(
            divert_target(
                None,
                Some("code"),
                Some("sig"),
                "en-US",
                "win",
                "firefox-stub",
                false,
            )
            .is_none()
        );
        assert!(
            divert_target(
                Some(ROOT),
                None,
                Some("sig"),
                "en-US",
                "win",
                "firefox-stub",
                false,
            )
            .is_none()
        );
        assert!(
            divert_target(
                Some(ROOT),
                Some("code"),
                Some(""),
                "en-US",
                "win",
                "firefox-stub",
                false,
            )
            .is_none()
        );
    }
}
