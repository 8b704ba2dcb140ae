//! Model-hosting API client.

use base64::Engine as _;
use serde::Deserialize;

use crate::LocalBoxFuture;
use crate::error::AcquisitionError;
use crate::source::Credential;

pub const SKETCHFAB_API_URL: &str = "https://api.sketchfab.com";
pub const MODEL_PASSWORD_HEADER: &str = "x-skfb-model-pwd";

const GLTF_ONLY_MESSAGE: &str =
    "GLTF format returns a ZIP file. Please ensure the model has GLB format available.";
const NO_GLB_MESSAGE: &str = "No GLB download URL found in response";

/// Turns a model identifier into a direct binary-model download URL.
pub trait ModelApi {
    fn resolve<'a>(
        &'a self,
        identifier: &'a str,
        credential: &'a Credential,
        password: Option<&'a Credential>,
    ) -> LocalBoxFuture<'a, Result<String, AcquisitionError>>;
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DownloadLink {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub expires: Option<u64>,
}

/// Body of `GET /v3/models/{uid}/download`. Other formats are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DownloadResponse {
    #[serde(default)]
    pub glb: Option<DownloadLink>,
    #[serde(default)]
    pub gltf: Option<DownloadLink>,
}

/// GLB wins; a glTF-only answer is a zipped archive the viewer cannot load.
pub fn select_download_url(response: &DownloadResponse) -> Result<String, AcquisitionError> {
    let usable = |link: &Option<DownloadLink>| {
        link.as_ref()
            .map(|l| l.url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    };
    if let Some(url) = usable(&response.glb) {
        return Ok(url);
    }
    if usable(&response.gltf).is_some() {
        return Err(AcquisitionError::UnsupportedFormat(GLTF_ONLY_MESSAGE.to_string()));
    }
    Err(AcquisitionError::AssetDecode(NO_GLB_MESSAGE.to_string()))
}

/// Map a non-success HTTP status to an error. `None` for 2xx.
pub fn error_for_status(status: u16, reason: Option<&str>) -> Option<AcquisitionError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(AcquisitionError::Auth { status }),
        404 => Some(AcquisitionError::NotFound),
        _ => Some(AcquisitionError::Transport(format!(
            "Error: {status} - {}",
            reason.unwrap_or("unexpected response")
        ))),
    }
}

/// The password header carries the password base64-encoded.
pub fn password_header_value(password: &Credential) -> String {
    base64::engine::general_purpose::STANDARD.encode(password.expose())
}

#[derive(Debug, Clone)]
pub struct SketchfabApi {
    base_url: String,
    client: reqwest::Client,
}

impl Default for SketchfabApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchfabApi {
    pub fn new() -> Self {
        Self::with_base_url(SKETCHFAB_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/v3/models/{identifier}/download`, with the identifier encoded
    /// as a single path segment.
    pub fn download_endpoint(&self, identifier: &str) -> Result<reqwest::Url, AcquisitionError> {
        let invalid =
            || AcquisitionError::Transport(format!("invalid API base URL: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["v3", "models", identifier.trim(), "download"]);
        Ok(url)
    }
}

impl ModelApi for SketchfabApi {
    fn resolve<'a>(
        &'a self,
        identifier: &'a str,
        credential: &'a Credential,
        password: Option<&'a Credential>,
    ) -> LocalBoxFuture<'a, Result<String, AcquisitionError>> {
        Box::pin(async move {
            let endpoint = self.download_endpoint(identifier)?;
            tracing::info!(%endpoint, with_password = password.is_some(), "resolving model");

            let mut request = self
                .client
                .get(endpoint.as_str())
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("Token {}", credential.expose()),
                )
                .header(reqwest::header::CONTENT_TYPE, "application/json");
            if let Some(password) = password {
                request = request.header(MODEL_PASSWORD_HEADER, password_header_value(password));
            }

            let resp = request
                .send()
                .await
                .map_err(|e| AcquisitionError::Transport(format!("request failed: {e}")))?;

            let status = resp.status();
            if let Some(err) = error_for_status(status.as_u16(), status.canonical_reason()) {
                tracing::warn!(%endpoint, %status, "model API rejected request");
                return Err(err);
            }

            let body: DownloadResponse = resp.json().await.map_err(|e| {
                AcquisitionError::AssetDecode(format!("invalid download response: {e}"))
            })?;
            select_download_url(&body)
        })
    }
}
