use std::fmt;

use crate::cache::CacheKey;

/// Served as the fallback model when no remote asset is requested.
pub const DEFAULT_MODEL_URL: &str =
    "https://maplibre.org/maplibre-gl-js/docs/assets/34M_17/34M_17.gltf";

pub const SKETCHFAB_PROVIDER: &str = "sketchfab";
pub const URL_PROVIDER: &str = "url";

/// A secret (API token, model password). Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// `None` for empty or whitespace-only input.
    pub fn non_blank(secret: Option<&str>) -> Option<Self> {
        secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Remote {
        identifier: String,
        credential: Credential,
        password: Option<Credential>,
    },
    Default,
    Url(String),
    Cached(CacheKey),
}

impl ModelSource {
    pub fn remote(
        identifier: impl Into<String>,
        credential: Credential,
        password: Option<Credential>,
    ) -> Self {
        ModelSource::Remote {
            identifier: identifier.into(),
            credential,
            password,
        }
    }

    /// Key under which this source's scene is cached.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            ModelSource::Remote { identifier, .. } => {
                CacheKey::new(SKETCHFAB_PROVIDER, identifier.trim())
            }
            ModelSource::Default => CacheKey::new(URL_PROVIDER, DEFAULT_MODEL_URL),
            ModelSource::Url(url) => CacheKey::new(URL_PROVIDER, url.trim()),
            ModelSource::Cached(key) => key.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ModelSource::Remote { .. })
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Remote { identifier, .. } => write!(f, "sketchfab:{identifier}"),
            ModelSource::Default => f.write_str("default model"),
            ModelSource::Url(url) => f.write_str(url),
            ModelSource::Cached(key) => write!(f, "cached {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Credential, DEFAULT_MODEL_URL, ModelSource};
    use crate::cache::CacheKey;

    #[test]
    fn credential_is_redacted() {
        let token = Credential::new("very-secret-token");
        let source = ModelSource::remote("abc123", token.clone(), None);
        assert!(!format!("{token:?}").contains("very-secret"));
        assert!(!format!("{source:?}").contains("very-secret"));
        assert_eq!(token.to_string(), "<redacted>");
        assert_eq!(token.expose(), "very-secret-token");
    }

    #[test]
    fn blank_credentials_are_dropped() {
        assert_eq!(Credential::non_blank(Some("  ")), None);
        assert_eq!(Credential::non_blank(None), None);
        assert_eq!(
            Credential::non_blank(Some(" tok ")),
            Some(Credential::new("tok"))
        );
    }

    #[test]
    fn cache_keys_per_source() {
        let remote = ModelSource::remote(" abc123 ", Credential::new("t"), None);
        assert_eq!(remote.cache_key(), CacheKey::new("sketchfab", "abc123"));
        assert_eq!(
            ModelSource::Default.cache_key(),
            CacheKey::new("url", DEFAULT_MODEL_URL)
        );
        let key = CacheKey::new("url", "https://example.com/car.glb");
        assert_eq!(ModelSource::Cached(key.clone()).cache_key(), key);
    }
}
