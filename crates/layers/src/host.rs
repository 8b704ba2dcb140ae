//! Boundary to the map rendering engine.

use std::fmt;

use foundation::geo::DEFAULT_ANCHOR_LNG_LAT;
use foundation::math::{Projection, WebMercator};
use serde::{Deserialize, Serialize};

use crate::layer::LayerId;

pub const MAPBOX_STYLE_URL: &str = "mapbox://styles/mapbox/standard";
pub const MAPLIBRE_STYLE_URL: &str = "https://demotiles.maplibre.org/style.json";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapProvider {
    Mapbox,
    #[serde(alias = "map-libre")]
    MapLibre,
}

impl MapProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mapbox" => Some(MapProvider::Mapbox),
            "maplibre" | "map-libre" => Some(MapProvider::MapLibre),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MapProvider::Mapbox => "mapbox",
            MapProvider::MapLibre => "maplibre",
        }
    }

    pub fn style_url(self) -> &'static str {
        match self {
            MapProvider::Mapbox => MAPBOX_STYLE_URL,
            MapProvider::MapLibre => MAPLIBRE_STYLE_URL,
        }
    }

    /// Mapbox refuses to load without an access token.
    pub fn requires_credential(self) -> bool {
        matches!(self, MapProvider::Mapbox)
    }
}

impl fmt::Display for MapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options passed to the engine when the map is created.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    pub provider: MapProvider,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub zoom: f64,
    pub center: [f64; 2],
    pub pitch: f64,
    pub bearing: f64,
    pub antialias: bool,
}

impl MapOptions {
    pub fn for_provider(provider: MapProvider, access_token: Option<String>) -> Self {
        Self {
            provider,
            style: provider.style_url().to_string(),
            access_token,
            zoom: 16.0,
            center: DEFAULT_ANCHOR_LNG_LAT,
            pitch: 60.0,
            bearing: -20.0,
            antialias: true,
        }
    }
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("provider", &self.provider)
            .field("style", &self.style)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("zoom", &self.zoom)
            .field("center", &self.center)
            .field("pitch", &self.pitch)
            .field("bearing", &self.bearing)
            .field("antialias", &self.antialias)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    NotInitialized,
    AlreadyInitialized,
    DuplicateLayer(LayerId),
    Engine(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NotInitialized => write!(f, "map is not initialized"),
            HostError::AlreadyInitialized => write!(f, "map is already initialized"),
            HostError::DuplicateLayer(id) => write!(f, "layer {id} is already registered"),
            HostError::Engine(msg) => write!(f, "map engine error: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// What the viewer needs from the map engine.
///
/// `initialize` only starts creating the map; the engine reports readiness
/// later through its style-load event.
pub trait MapHost {
    fn initialize(&mut self, options: &MapOptions) -> Result<(), HostError>;
    fn teardown(&mut self);
    fn add_custom_layer(&mut self, id: &LayerId) -> Result<(), HostError>;
    /// Returns `false` if the engine did not know `id`.
    fn remove_layer(&mut self, id: &LayerId) -> bool;
    fn has_layer(&self, id: &LayerId) -> bool;
    fn trigger_repaint(&mut self);
    fn projection(&self) -> &dyn Projection;
}

/// In-memory map engine for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingMapHost {
    options: Option<MapOptions>,
    layers: Vec<LayerId>,
    projection: WebMercator,
    repaints: u64,
    layers_added: u64,
    max_concurrent_layers: usize,
    teardowns: u64,
}

impl RecordingMapHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> Option<&MapOptions> {
        self.options.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.options.is_some()
    }

    pub fn layers(&self) -> &[LayerId] {
        &self.layers
    }

    pub fn repaints(&self) -> u64 {
        self.repaints
    }

    pub fn layers_added(&self) -> u64 {
        self.layers_added
    }

    /// Highest number of layers ever registered at the same time.
    pub fn max_concurrent_layers(&self) -> usize {
        self.max_concurrent_layers
    }

    pub fn teardowns(&self) -> u64 {
        self.teardowns
    }
}

impl MapHost for RecordingMapHost {
    fn initialize(&mut self, options: &MapOptions) -> Result<(), HostError> {
        if self.options.is_some() {
            return Err(HostError::AlreadyInitialized);
        }
        self.options = Some(options.clone());
        Ok(())
    }

    fn teardown(&mut self) {
        if self.options.take().is_some() {
            self.teardowns += 1;
        }
        self.layers.clear();
    }

    fn add_custom_layer(&mut self, id: &LayerId) -> Result<(), HostError> {
        if self.options.is_none() {
            return Err(HostError::NotInitialized);
        }
        if self.has_layer(id) {
            return Err(HostError::DuplicateLayer(id.clone()));
        }
        self.layers.push(id.clone());
        self.layers_added += 1;
        self.max_concurrent_layers = self.max_concurrent_layers.max(self.layers.len());
        Ok(())
    }

    fn remove_layer(&mut self, id: &LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l != id);
        self.layers.len() != before
    }

    fn has_layer(&self, id: &LayerId) -> bool {
        self.layers.contains(id)
    }

    fn trigger_repaint(&mut self) {
        self.repaints += 1;
    }

    fn projection(&self) -> &dyn Projection {
        &self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::{HostError, MapHost, MapOptions, MapProvider, RecordingMapHost};
    use crate::layer::LayerId;
    use pretty_assertions::assert_eq;

    #[test]
    fn provider_defaults() {
        let options = MapOptions::for_provider(MapProvider::Mapbox, Some("pk.secret".into()));
        assert_eq!(options.style, "mapbox://styles/mapbox/standard");
        assert_eq!(options.center, [24.9441, 60.1710]);
        assert_eq!((options.zoom, options.pitch, options.bearing), (16.0, 60.0, -20.0));
        assert!(MapProvider::Mapbox.requires_credential());
        assert!(!MapProvider::MapLibre.requires_credential());
        assert_eq!(MapProvider::from_name(" MapLibre "), Some(MapProvider::MapLibre));
        assert_eq!(MapProvider::from_name("leaflet"), None);
    }

    #[test]
    fn debug_output_hides_token() {
        let options = MapOptions::for_provider(MapProvider::Mapbox, Some("pk.secret".into()));
        let debug = format!("{options:?}");
        assert!(!debug.contains("pk.secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn options_serialize_for_the_engine() {
        let options = MapOptions::for_provider(MapProvider::MapLibre, None);
        let json = serde_json::to_value(&options).expect("serialize");
        assert_eq!(json["provider"], "maplibre");
        assert_eq!(json["style"], "https://demotiles.maplibre.org/style.json");
        assert!(json.get("access_token").is_none());
        let back: MapOptions = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, options);
    }

    #[test]
    fn recording_host_tracks_layers() {
        let mut host = RecordingMapHost::new();
        let id = LayerId::new("3d-model-1");
        assert_eq!(host.add_custom_layer(&id), Err(HostError::NotInitialized));

        host.initialize(&MapOptions::for_provider(MapProvider::MapLibre, None))
            .expect("init");
        host.add_custom_layer(&id).expect("add");
        assert_eq!(
            host.add_custom_layer(&id),
            Err(HostError::DuplicateLayer(id.clone()))
        );
        assert!(host.remove_layer(&id));
        assert!(!host.remove_layer(&id));

        host.teardown();
        assert!(!host.is_initialized());
        assert_eq!(host.teardowns(), 1);
    }
}
