use scene::SceneGraph;

use crate::error::AcquisitionError;
use crate::fetch::{AssetFetcher, Progress};
use crate::loader::{LoadedScene, load_scene};
use crate::remote::ModelApi;
use crate::source::Credential;

/// What a load has to do, decided before any I/O starts.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPlan {
    /// The scene is already in memory; no network access.
    Cached(SceneGraph),
    Remote {
        identifier: String,
        credential: Credential,
        password: Option<Credential>,
    },
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquireEvent {
    Resolving,
    Resolved(String),
    Progress(Progress),
}

/// Run a [`LoadPlan`] to completion.
///
/// Every failure comes back as an [`AcquisitionError`]; nothing here panics.
pub async fn acquire(
    api: &dyn ModelApi,
    fetcher: &dyn AssetFetcher,
    plan: LoadPlan,
    on_event: &mut dyn FnMut(AcquireEvent),
) -> Result<LoadedScene, AcquisitionError> {
    let url = match plan {
        LoadPlan::Cached(graph) => return Ok(LoadedScene::cached(graph)),
        LoadPlan::Url(url) => url,
        LoadPlan::Remote {
            identifier,
            credential,
            password,
        } => {
            on_event(AcquireEvent::Resolving);
            let url = api
                .resolve(&identifier, &credential, password.as_ref())
                .await?;
            on_event(AcquireEvent::Resolved(url.clone()));
            url
        }
    };

    load_scene(fetcher, &url, &mut |p| on_event(AcquireEvent::Progress(p))).await
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{AcquireEvent, LoadPlan, acquire};
    use crate::LocalBoxFuture;
    use crate::error::AcquisitionError;
    use crate::fetch::{MemoryAssetFetcher, Progress};
    use crate::remote::ModelApi;
    use crate::source::Credential;
    use scene::SceneGraph;

    const CUBE: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [ { "byteLength": 288, "uri": "model.bin" } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 288 } ],
        "nodes": [ { "mesh": 0 } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
              "min": [-1, -1, -1], "max": [1, 1, 1] }
        ]
    }"#;

    #[derive(Default)]
    struct FakeApi {
        calls: Cell<u32>,
    }

    impl ModelApi for FakeApi {
        fn resolve<'a>(
            &'a self,
            identifier: &'a str,
            credential: &'a Credential,
            _password: Option<&'a Credential>,
        ) -> LocalBoxFuture<'a, Result<String, AcquisitionError>> {
            self.calls.set(self.calls.get() + 1);
            Box::pin(async move {
                if credential.expose() != "secret" {
                    return Err(AcquisitionError::Auth { status: 401 });
                }
                Ok(format!("mem://{identifier}.glb"))
            })
        }
    }

    fn fetcher() -> MemoryAssetFetcher {
        MemoryAssetFetcher::new().with_asset("mem://abc123.glb", CUBE.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn remote_plan_resolves_then_fetches() {
        let api = FakeApi::default();
        let mut events = Vec::new();
        let plan = LoadPlan::Remote {
            identifier: "abc123".to_string(),
            credential: Credential::new("secret"),
            password: None,
        };
        let loaded = acquire(&api, &fetcher(), plan, &mut |e| events.push(e))
            .await
            .expect("acquire");

        assert_eq!(loaded.graph.mesh_count(), 1);
        assert_eq!(loaded.normalization, None);
        assert_eq!(
            events,
            vec![
                AcquireEvent::Resolving,
                AcquireEvent::Resolved("mem://abc123.glb".to_string()),
                AcquireEvent::Progress(Progress::Percent(100)),
            ]
        );
    }

    #[tokio::test]
    async fn cached_plan_skips_io() {
        let api = FakeApi::default();
        let mut events = Vec::new();
        let loaded = acquire(
            &api,
            &MemoryAssetFetcher::new(),
            LoadPlan::Cached(SceneGraph::new()),
            &mut |e| events.push(e),
        )
        .await
        .expect("cached");
        assert!(loaded.from_cache);
        assert!(events.is_empty());
        assert_eq!(api.calls.get(), 0);
    }

    #[tokio::test]
    async fn failures_are_returned() {
        let api = FakeApi::default();
        let plan = LoadPlan::Remote {
            identifier: "abc123".to_string(),
            credential: Credential::new("wrong"),
            password: None,
        };
        assert_eq!(
            acquire(&api, &fetcher(), plan, &mut |_| {}).await,
            Err(AcquisitionError::Auth { status: 401 })
        );
        assert_eq!(
            acquire(&api, &fetcher(), LoadPlan::Url("mem://gone".into()), &mut |_| {}).await,
            Err(AcquisitionError::NotFound)
        );
    }
}
