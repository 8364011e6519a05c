//! Legacy channel pinning.
//!
//! A product identifier splits into `family-suffix`. For the families that
//! still serve end-of-life Windows clients, the suffix is classified and, when
//! it names a version newer than the family's channel ceiling, replaced with
//! that ceiling. Update packages pass through untouched: they target a build
//! the client already has.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::version::compare_versions;

/// Release channel inferred from a product suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Stable release line.
    Release,
    /// Pre-release line, marked by a `.0b` run in the version token.
    Beta,
    /// Extended-support line, marked by `esr` in the version token.
    Esr,
}

/// Classified shape of a product suffix, produced before any version
/// comparison runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixKind<'a> {
    /// Complete or partial update package; never substituted.
    UpdatePackage,
    /// Versionless channel alias such as `latest` or `beta-stub`.
    ChannelAlias {
        /// Channel the alias names.
        channel: Channel,
        /// Qualifier re-appended after the ceiling, if the alias carries one.
        qualifier: Option<&'a str>,
    },
    /// Leading version token with an optional trailing qualifier.
    ExplicitVersion {
        /// Channel inferred from markers in the version token.
        channel: Channel,
        /// The version token itself.
        version: &'a str,
        /// Everything after the first `-`, if present.
        qualifier: Option<&'a str>,
    },
}

/// Classifies a product suffix.
#[must_use]
pub fn classify_suffix(suffix: &str) -> SuffixKind<'_> {
    if is_update_package(suffix) {
        return SuffixKind::UpdatePackage;
    }
    if let Some((channel, qualifier)) = channel_alias(suffix) {
        return SuffixKind::ChannelAlias { channel, qualifier };
    }
    let (version, qualifier) = match suffix.split_once('-') {
        Some((version, qualifier)) => (version, Some(qualifier)),
        None => (suffix, None),
    };
    SuffixKind::ExplicitVersion {
        channel: version_channel(version),
        version,
        qualifier,
    }
}

fn is_update_package(suffix: &str) -> bool {
    suffix == "complete"
        || suffix.ends_with("-complete")
        || suffix.starts_with("partial-")
        || suffix.contains("-partial-")
}

fn channel_alias(suffix: &str) -> Option<(Channel, Option<&'static str>)> {
    match suffix {
        "latest" => Some((Channel::Release, None)),
        "ssl" => Some((Channel::Release, Some("ssl"))),
        "stub" => Some((Channel::Release, Some("stub"))),
        "beta" | "beta-latest" => Some((Channel::Beta, None)),
        "beta-stub" => Some((Channel::Beta, Some("stub"))),
        _ => None,
    }
}

fn version_channel(version: &str) -> Channel {
    if version.contains(".0b") {
        Channel::Beta
    } else if version.contains("esr") {
        Channel::Esr
    } else {
        Channel::Release
    }
}

/// Highest version per channel still served to a legacy client.
#[derive(Debug, Clone)]
pub struct ChannelCeilings {
    release: String,
    beta: String,
    esr: Option<String>,
}

impl ChannelCeilings {
    /// Ceilings for a family with release and beta channels only.
    #[must_use]
    pub fn new(release: impl Into<String>, beta: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            beta: beta.into(),
            esr: None,
        }
    }

    /// Adds an extended-support ceiling.
    #[must_use]
    pub fn with_esr(mut self, esr: impl Into<String>) -> Self {
        self.esr = Some(esr.into());
        self
    }

    /// Ceiling for one channel. Families without an extended-support line
    /// compare esr-marked versions against their release ceiling.
    #[must_use]
    pub fn ceiling(&self, channel: Channel) -> &str {
        match channel {
            Channel::Release => &self.release,
            Channel::Beta => &self.beta,
            Channel::Esr => self.esr.as_deref().unwrap_or(&self.release),
        }
    }
}

/// Per-family pinning table injected into the engine.
#[derive(Debug, Clone)]
pub struct PinningRules {
    families: HashMap<String, ChannelCeilings>,
}

impl PinningRules {
    /// A rule set with no pinned families; every product passes through.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            families: HashMap::new(),
        }
    }

    /// Registers ceilings for a product family.
    #[must_use]
    pub fn family(mut self, name: impl Into<String>, ceilings: ChannelCeilings) -> Self {
        self.families.insert(name.into(), ceilings);
        self
    }

    /// Rewrites a product identifier to the highest build its family still
    /// serves to legacy clients. Identifiers without a `-` or without a
    /// recognized family pass through unchanged.
    #[must_use]
    pub fn pin_product(&self, product: &str) -> String {
        let Some((family, suffix)) = product.split_once('-') else {
            return product.to_string();
        };
        let Some(ceilings) = self.families.get(family) else {
            return product.to_string();
        };
        format!("{family}-{}", pin_suffix(ceilings, suffix))
    }
}

impl Default for PinningRules {
    /// Shipping ceilings for the two families that still pin.
    fn default() -> Self {
        Self::empty()
            .family(
                "firefox",
                ChannelCeilings::new("43.0.1", "44.0b1").with_esr("38.5.1esr"),
            )
            .family("thunderbird", ChannelCeilings::new("38.5.0", "43.0b1"))
    }
}

fn pin_suffix(ceilings: &ChannelCeilings, suffix: &str) -> String {
    match classify_suffix(suffix) {
        SuffixKind::UpdatePackage => suffix.to_string(),
        SuffixKind::ChannelAlias { channel, qualifier } => {
            join_qualifier(ceilings.ceiling(channel), qualifier)
        }
        SuffixKind::ExplicitVersion {
            channel,
            version,
            qualifier,
        } => {
            let ceiling = ceilings.ceiling(channel);
            if compare_versions(version, ceiling) == Ordering::Less {
                suffix.to_string()
            } else {
                join_qualifier(ceiling, qualifier)
            }
        }
    }
}

fn join_qualifier(version: &str, qualifier: Option<&str>) -> String {
    qualifier.map_or_else(
        || version.to_string(),
        |qualifier| format!("{version}-{qualifier}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_update_packages() {
        assert_eq!(classify_suffix("43.0.1-complete"), SuffixKind::UpdatePackage);
        assert_eq!(
            classify_suffix("43.0.1-partial-41.0.2build1"),
            SuffixKind::UpdatePackage
        );
        assert_eq!(classify_suffix("complete"), SuffixKind::UpdatePackage);
        assert_eq!(classify_suffix("partial-40.0"), SuffixKind::UpdatePackage);
    }

    #[test]
    fn classifies_channel_aliases() {
        assert_eq!(
            classify_suffix("latest"),
            SuffixKind::ChannelAlias {
                channel: Channel::Release,
                qualifier: None,
            }
        );
        assert_eq!(
            classify_suffix("ssl"),
            SuffixKind::ChannelAlias {
                channel: Channel::Release,
                qualifier: Some("ssl"),
            }
        );
        assert_eq!(
            classify_suffix("beta-latest"),
            SuffixKind::ChannelAlias {
                channel: Channel::Beta,
                qualifier: None,
            }
        );
        assert_eq!(
            classify_suffix("beta-stub"),
            SuffixKind::ChannelAlias {
                channel: Channel::Beta,
                qualifier: Some("stub"),
            }
        );
    }

    #[test]
    fn classifies_explicit_versions() {
        assert_eq!(
            classify_suffix("43.0.2-ssl"),
            SuffixKind::ExplicitVersion {
                channel: Channel::Release,
                version: "43.0.2",
                qualifier: Some("ssl"),
            }
        );
        assert_eq!(
            classify_suffix("45.0b2"),
            SuffixKind::ExplicitVersion {
                channel: Channel::Beta,
                version: "45.0b2",
                qualifier: None,
            }
        );
        assert_eq!(
            classify_suffix("38.6.3esr"),
            SuffixKind::ExplicitVersion {
                channel: Channel::Esr,
                version: "38.6.3esr",
                qualifier: None,
            }
        );
    }

    #[test]
    fn pins_firefox_products() {
        let rules = PinningRules::default();
        let cases = [
            ("firefox-latest", "firefox-43.0.1"),
            ("firefox-ssl", "firefox-43.0.1-ssl"),
            ("firefox-stub", "firefox-43.0.1-stub"),
            ("firefox-beta", "firefox-44.0b1"),
            ("firefox-beta-latest", "firefox-44.0b1"),
            ("firefox-beta-stub", "firefox-44.0b1-stub"),
            ("firefox-43.0.2", "firefox-43.0.1"),
            ("firefox-43.0.2-ssl", "firefox-43.0.1-ssl"),
            ("firefox-43.0.1-ssl", "firefox-43.0.1-ssl"),
            ("firefox-42.0", "firefox-42.0"),
            ("firefox-45.0b2", "firefox-44.0b1"),
            ("firefox-44.0b2", "firefox-44.0b1"),
            ("firefox-43.0b1", "firefox-43.0b1"),
            ("firefox-38.6.3esr", "firefox-38.5.1esr"),
            ("firefox-38.5.1esr", "firefox-38.5.1esr"),
            ("firefox-38.5.0esr", "firefox-38.5.0esr"),
            ("firefox-43.0.1-complete", "firefox-43.0.1-complete"),
            (
                "firefox-43.0.1-partial-41.0.2build1",
                "firefox-43.0.1-partial-41.0.2build1",
            ),
            ("firefox-50.0-complete", "firefox-50.0-complete"),
            ("firefox", "firefox"),
        ];
        for (input, expected) in cases {
            assert_eq!(rules.pin_product(input), expected, "input: {input}");
        }
    }

    #[test]
    fn pins_thunderbird_products() {
        let rules = PinningRules::default();
        let cases = [
            ("thunderbird-latest", "thunderbird-38.5.0"),
            ("thunderbird-ssl", "thunderbird-38.5.0-ssl"),
            ("thunderbird-beta", "thunderbird-43.0b1"),
            ("thunderbird-beta-latest", "thunderbird-43.0b1"),
            ("thunderbird-38.6.0", "thunderbird-38.5.0"),
            ("thunderbird-38.4.0", "thunderbird-38.4.0"),
            ("thunderbird-44.0b1", "thunderbird-43.0b1"),
            ("thunderbird-42.0b1", "thunderbird-42.0b1"),
            // No extended-support ceiling: esr-shaped versions compare
            // against the release line.
            ("thunderbird-38.5.2esr", "thunderbird-38.5.0"),
            ("thunderbird-38.4.0esr", "thunderbird-38.4.0esr"),
        ];
        for (input, expected) in cases {
            assert_eq!(rules.pin_product(input), expected, "input: {input}");
        }
    }

    #[test]
    fn unrecognized_families_pass_through() {
        let rules = PinningRules::default();
        assert_eq!(rules.pin_product("seamonkey-2.39"), "seamonkey-2.39");
        assert_eq!(rules.pin_product("firefox"), "firefox");
        assert_eq!(PinningRules::empty().pin_product("firefox-latest"), "firefox-latest");
    }

    #[test]
    fn pinning_is_idempotent() {
        let rules = PinningRules::default();
        let inputs = [
            "firefox-latest",
            "firefox-ssl",
            "firefox-beta-stub",
            "firefox-43.0.2-ssl",
            "firefox-45.0b2",
            "firefox-38.6.3esr",
            "firefox-43.0.1-partial-41.0.2build1",
            "thunderbird-latest",
            "thunderbird-44.0b1",
            "seamonkey-2.39",
        ];
        for input in inputs {
            let once = rules.pin_product(input);
            assert_eq!(rules.pin_product(&once), once, "input: {input}");
        }
    }

    #[test]
    fn alternate_ceilings_are_honored() {
        let rules = PinningRules::empty().family(
            "firefox",
            ChannelCeilings::new("50.0.2", "51.0b9").with_esr("45.8.0esr"),
        );
        assert_eq!(rules.pin_product("firefox-latest"), "firefox-50.0.2");
        assert_eq!(rules.pin_product("firefox-52.0"), "firefox-50.0.2");
        assert_eq!(rules.pin_product("firefox-49.0"), "firefox-49.0");
        assert_eq!(rules.pin_product("firefox-53.0b1"), "firefox-51.0b9");
        assert_eq!(rules.pin_product("firefox-46.0.1esr"), "firefox-45.8.0esr");
    }
}
