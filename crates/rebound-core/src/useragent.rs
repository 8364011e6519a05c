//! End-of-life Windows client detection.

use regex::Regex;

use crate::error::EngineError;

/// Pattern identifying Windows XP (NT 5.1 or the literal "XP"), Server 2003
/// (NT 5.2), and Vista (NT 6.0) user agents.
pub const LEGACY_WINDOWS_PATTERN: &str = "Windows (?:NT 5.1|XP|NT 5.2|NT 6.0)";

/// Compiled matcher for user agents that require legacy pinning.
#[derive(Debug, Clone)]
pub struct LegacyClientMatcher {
    pattern: Regex,
}

impl LegacyClientMatcher {
    /// Compiles the default end-of-life Windows pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> Result<Self, EngineError> {
        Self::from_pattern(LEGACY_WINDOWS_PATTERN)
    }

    /// Compiles a custom pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn from_pattern(pattern: &str) -> Result<Self, EngineError> {
        let pattern =
            Regex::new(pattern).map_err(|source| EngineError::PatternCompile { source })?;
        Ok(Self { pattern })
    }

    /// Whether the user agent identifies a client that requires pinning.
    #[must_use]
    pub fn is_legacy(&self, user_agent: &str) -> bool {
        self.pattern.is_match(user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn classifies_end_of_life_windows_agents() -> Result<()> {
        let matcher = LegacyClientMatcher::new()?;
        let cases = [
            (
                "Mozilla/5.0 (Windows NT 5.1; rv:43.0) Gecko/20100101 Firefox/43.0",
                true,
            ),
            (
                "Mozilla/5.0 (Windows NT 5.2; rv:43.0) Gecko/20100101 Firefox/43.0",
                true,
            ),
            (
                "Mozilla/5.0 (Windows NT 6.0; rv:43.0) Gecko/20100101 Firefox/43.0",
                true,
            ),
            ("Mozilla/4.0 (compatible; MSIE 6.0; Windows XP 5.1)", true),
            (
                "Mozilla/5.0 (Windows NT 5.0; rv:43.0) Gecko/20100101 Firefox/43.0",
                false,
            ),
            (
                "Mozilla/5.0 (Windows NT 6.1; rv:43.0) Gecko/20100101 Firefox/43.0",
                false,
            ),
            (
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.11; rv:43.0) Gecko/20100101 Firefox/43.0",
                false,
            ),
            ("", false),
        ];
        for (user_agent, expected) in cases {
            assert_eq!(
                matcher.is_legacy(user_agent),
                expected,
                "user agent: {user_agent:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn custom_pattern_is_honored() -> Result<()> {
        let matcher = LegacyClientMatcher::from_pattern("AncientBrowser")?;
        assert!(matcher.is_legacy("AncientBrowser/1.0"));
        assert!(!matcher.is_legacy("ModernBrowser/99.0"));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(LegacyClientMatcher::from_pattern("(").is_err());
    }
}
