//! Mirror base selection.

use crate::error::EngineError;

/// URL scheme a request requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorScheme {
    /// Plain HTTP delivery.
    Http,
    /// TLS delivery, required by pinned requests and SSL-only products.
    Https,
}

impl MirrorScheme {
    /// The scheme prefix without separator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Configured mirror hosts, at most one per scheme.
#[derive(Debug, Clone, Default)]
pub struct MirrorBases {
    http: Option<String>,
    https: Option<String>,
}

impl MirrorBases {
    /// Builds the mirror table from configured hosts.
    #[must_use]
    pub const fn new(http: Option<String>, https: Option<String>) -> Self {
        Self { http, https }
    }

    /// Base URL for the scheme the request requires.
    ///
    /// An HTTPS requirement is never satisfied by the HTTP mirror and a plain
    /// request is never upgraded; a missing base for the required scheme is a
    /// configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoMirror`] when no base is configured for the
    /// required scheme.
    pub fn base_url(&self, require_https: bool) -> Result<String, EngineError> {
        let (scheme, host) = if require_https {
            (MirrorScheme::Https, self.https.as_deref())
        } else {
            (MirrorScheme::Http, self.http.as_deref())
        };
        host.map(|host| format!("{}://{host}", scheme.as_str()))
            .ok_or(EngineError::NoMirror { scheme })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn selects_base_for_required_scheme() -> Result<()> {
        let bases = MirrorBases::new(
            Some("download.example.net".to_string()),
            Some("download-ssl.example.net".to_string()),
        );
        assert_eq!(bases.base_url(false)?, "http://download.example.net");
        assert_eq!(bases.base_url(true)?, "https://download-ssl.example.net");
        Ok(())
    }

    #[test]
    fn missing_required_scheme_is_an_error() {
        let https_only = MirrorBases::new(None, Some("download-ssl.example.net".to_string()));
        assert!(matches!(
            https_only.base_url(false),
            Err(EngineError::NoMirror {
                scheme: MirrorScheme::Http,
            })
        ));

        let http_only = MirrorBases::new(Some("download.example.net".to_string()), None);
        assert!(matches!(
            http_only.base_url(true),
            Err(EngineError::NoMirror {
                scheme: MirrorScheme::Https,
            })
        ));
    }
}
