use std::fmt;

use layers::MapProvider;
use serde::{Deserialize, Serialize};
use streaming::{Credential, DEFAULT_MODEL_URL, ModelSource, SKETCHFAB_API_URL};

pub const ENV_MAP_PROVIDER: &str = "MAP_PROVIDER";
pub const ENV_MAPBOX_ACCESS_TOKEN: &str = "MAPBOX_ACCESS_TOKEN";
pub const ENV_SKETCHFAB_API_TOKEN: &str = "SKETCHFAB_API_TOKEN";
pub const ENV_SKETCHFAB_MODEL_PASSWORD: &str = "SKETCHFAB_MODEL_PASSWORD";
pub const ENV_SKETCHFAB_API_URL: &str = "SKETCHFAB_API_URL";
pub const ENV_DEFAULT_MODEL_URL: &str = "DEFAULT_MODEL_URL";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Json(String),
    UnknownProvider(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid viewer config: {e}"),
            ConfigError::UnknownProvider(name) => {
                write!(f, "unknown map provider {name:?} (expected mapbox or maplibre)")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Viewer settings. Every field has a default, so an empty JSON object or
/// an empty environment is a valid configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub map_provider: MapProvider,
    pub mapbox_access_token: Option<String>,
    pub sketchfab_api_token: Option<String>,
    pub sketchfab_model_password: Option<String>,
    pub sketchfab_api_url: String,
    pub default_model_url: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            map_provider: MapProvider::Mapbox,
            mapbox_access_token: None,
            sketchfab_api_token: None,
            sketchfab_model_password: None,
            sketchfab_api_url: SKETCHFAB_API_URL.to_string(),
            default_model_url: DEFAULT_MODEL_URL.to_string(),
        }
    }
}

impl fmt::Debug for ViewerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ViewerConfig")
            .field("map_provider", &self.map_provider)
            .field("mapbox_access_token", &redact(&self.mapbox_access_token))
            .field("sketchfab_api_token", &redact(&self.sketchfab_api_token))
            .field("sketchfab_model_password", &redact(&self.sketchfab_model_password))
            .field("sketchfab_api_url", &self.sketchfab_api_url)
            .field("default_model_url", &self.default_model_url)
            .finish()
    }
}

impl ViewerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank values keep
    /// their defaults.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(name) = get(ENV_MAP_PROVIDER) {
            config.map_provider =
                MapProvider::from_name(&name).ok_or(ConfigError::UnknownProvider(name))?;
        }
        config.mapbox_access_token = get(ENV_MAPBOX_ACCESS_TOKEN);
        config.sketchfab_api_token = get(ENV_SKETCHFAB_API_TOKEN);
        config.sketchfab_model_password = get(ENV_SKETCHFAB_MODEL_PASSWORD);
        if let Some(url) = get(ENV_SKETCHFAB_API_URL) {
            config.sketchfab_api_url = url;
        }
        if let Some(url) = get(ENV_DEFAULT_MODEL_URL) {
            config.default_model_url = url;
        }
        Ok(config)
    }

    pub fn map_credential(&self) -> Option<Credential> {
        Credential::non_blank(self.mapbox_access_token.as_deref())
    }

    /// A remote source for `identifier` using the configured token and
    /// password. `None` when no token is configured.
    pub fn remote_source(&self, identifier: &str) -> Option<ModelSource> {
        let credential = Credential::non_blank(self.sketchfab_api_token.as_deref())?;
        let password = Credential::non_blank(self.sketchfab_model_password.as_deref());
        Some(ModelSource::remote(identifier.trim(), credential, password))
    }
}
