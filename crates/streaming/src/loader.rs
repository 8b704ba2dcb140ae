use scene::SceneGraph;

use crate::error::AcquisitionError;
use crate::fetch::{AssetFetcher, Progress};

/// A decoded, size-normalized model ready to insert into a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScene {
    pub graph: SceneGraph,
    /// Scale factor applied to shrink an oversized model.
    pub normalization: Option<f64>,
    /// Asset URL the bytes came from; `None` when served from the cache.
    pub url: Option<String>,
    pub byte_len: usize,
    pub from_cache: bool,
}

impl LoadedScene {
    pub fn cached(graph: SceneGraph) -> Self {
        Self {
            graph,
            normalization: None,
            url: None,
            byte_len: 0,
            from_cache: true,
        }
    }

    /// Directory part of [`LoadedScene::url`], against which a glTF's
    /// external buffers and images resolve. Empty for cached scenes.
    pub fn resource_base(&self) -> &str {
        self.url.as_deref().map(resource_base).unwrap_or("")
    }
}

/// Everything up to and including the last `/` of the URL path.
pub fn resource_base(url: &str) -> &str {
    let path_end = url.find(['?', '#']).unwrap_or(url.len());
    match url[..path_end].rfind('/') {
        Some(i) => &url[..=i],
        None => "",
    }
}

/// Decode raw model bytes and shrink the result if it is oversized.
pub fn decode_scene(bytes: &[u8]) -> Result<(SceneGraph, Option<f64>), AcquisitionError> {
    let mut graph = formats::decode_model(bytes)?;
    let factor = graph.normalize_scale();
    Ok((graph, factor))
}

/// Fetch, decode and normalize the model at `url`.
pub async fn load_scene(
    fetcher: &dyn AssetFetcher,
    url: &str,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<LoadedScene, AcquisitionError> {
    let bytes = fetcher.fetch(url, on_progress).await?;
    let (graph, normalization) = decode_scene(&bytes)?;
    tracing::info!(
        %url,
        bytes = bytes.len(),
        nodes = graph.node_count(),
        ?normalization,
        "model decoded"
    );
    Ok(LoadedScene {
        graph,
        normalization,
        url: Some(url.to_string()),
        byte_len: bytes.len(),
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::{LoadedScene, load_scene, resource_base};
    use crate::error::AcquisitionError;
    use crate::fetch::{MemoryAssetFetcher, Progress};

    const BIG_CAR: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [ { "byteLength": 288, "uri": "model.bin" } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 288 } ],
        "nodes": [ { "mesh": 0 } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
              "min": [0, 0, 0], "max": [250, 40, 120] }
        ]
    }"#;

    fn fetcher() -> MemoryAssetFetcher {
        MemoryAssetFetcher::new()
            .with_asset("mem://car.gltf", BIG_CAR.as_bytes().to_vec())
            .with_asset("mem://car.zip", b"PK\x03\x04....".to_vec())
            .with_asset("mem://junk", b"\x00junk".to_vec())
    }

    #[tokio::test]
    async fn oversized_model_is_normalized() {
        let fetcher = fetcher();
        let mut progress = Vec::new();
        let loaded = load_scene(&fetcher, "mem://car.gltf", &mut |p| progress.push(p))
            .await
            .expect("load");
        assert_eq!(loaded.normalization, Some(0.2));
        assert!((loaded.graph.world_bounds().max_dimension() - 50.0).abs() < 1e-9);
        assert_eq!(loaded.url.as_deref(), Some("mem://car.gltf"));
        assert!(!loaded.from_cache);
        assert_eq!(progress, vec![Progress::Percent(100)]);
    }

    #[tokio::test]
    async fn decode_failures_are_classified() {
        let fetcher = fetcher();
        assert!(matches!(
            load_scene(&fetcher, "mem://car.zip", &mut |_| {}).await,
            Err(AcquisitionError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            load_scene(&fetcher, "mem://junk", &mut |_| {}).await,
            Err(AcquisitionError::AssetDecode(_))
        ));
        assert_eq!(
            load_scene(&fetcher, "mem://missing", &mut |_| {}).await,
            Err(AcquisitionError::NotFound)
        );
    }

    #[test]
    fn resource_base_strips_file_and_query() {
        assert_eq!(
            resource_base("https://maplibre.org/docs/assets/34M_17/34M_17.gltf"),
            "https://maplibre.org/docs/assets/34M_17/"
        );
        assert_eq!(
            resource_base("https://cdn.example/models/a.glb?sig=x/y#frag"),
            "https://cdn.example/models/"
        );
        assert_eq!(resource_base("car.glb"), "");
        assert_eq!(LoadedScene::cached(scene::SceneGraph::new()).resource_base(), "");
    }
}
