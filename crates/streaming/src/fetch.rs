use std::collections::BTreeMap;

use futures_util::StreamExt;

use crate::LocalBoxFuture;
use crate::error::AcquisitionError;
use crate::remote::error_for_status;

/// Download progress for one asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Whole percent of a known total, `0..=100`.
    Percent(u8),
    /// The server did not announce a size.
    Indeterminate { loaded_bytes: u64 },
}

impl Progress {
    pub fn from_bytes(loaded: u64, total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => {
                let pct = (loaded as f64 / total as f64 * 100.0).round();
                Progress::Percent(pct.clamp(0.0, 100.0) as u8)
            }
            _ => Progress::Indeterminate {
                loaded_bytes: loaded,
            },
        }
    }

    /// Status line for the user. Nothing is shown without a known total.
    pub fn status_text(&self) -> Option<String> {
        match self {
            Progress::Percent(pct) => Some(format!("Loading model: {pct}%")),
            Progress::Indeterminate { .. } => None,
        }
    }
}

/// Fetches asset bytes, reporting progress as chunks arrive.
pub trait AssetFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AcquisitionError>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AcquisitionError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| AcquisitionError::Transport(format!("download failed: {e}")))?;

            let status = resp.status();
            if let Some(err) = error_for_status(status.as_u16(), status.canonical_reason()) {
                tracing::warn!(%url, %status, "asset download rejected");
                return Err(err);
            }

            let total = resp.content_length();
            let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(64 << 20) as usize);
            on_progress(Progress::from_bytes(0, total));

            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| {
                    AcquisitionError::Transport(format!("download interrupted: {e}"))
                })?;
                bytes.extend_from_slice(&chunk);
                on_progress(Progress::from_bytes(bytes.len() as u64, total));
            }

            tracing::debug!(%url, bytes = bytes.len(), "asset downloaded");
            Ok(bytes)
        })
    }
}

/// Serves assets from memory. Used for local files and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetFetcher {
    assets: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(url.into(), bytes);
    }

    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl AssetFetcher for MemoryAssetFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AcquisitionError>> {
        Box::pin(async move {
            let bytes = self.assets.get(url).cloned().ok_or(AcquisitionError::NotFound)?;
            let len = bytes.len() as u64;
            on_progress(Progress::from_bytes(len, Some(len)));
            Ok(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetFetcher, HttpAssetFetcher, MemoryAssetFetcher, Progress};
    use crate::error::AcquisitionError;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[test]
    fn percent_rounds_like_to_fixed() {
        assert_eq!(Progress::from_bytes(0, Some(200)), Progress::Percent(0));
        assert_eq!(Progress::from_bytes(1, Some(8)), Progress::Percent(13));
        assert_eq!(Progress::from_bytes(333, Some(1000)), Progress::Percent(33));
        assert_eq!(Progress::from_bytes(200, Some(200)), Progress::Percent(100));
        assert_eq!(
            Progress::from_bytes(5, None),
            Progress::Indeterminate { loaded_bytes: 5 }
        );
        assert_eq!(
            Progress::from_bytes(5, Some(0)),
            Progress::Indeterminate { loaded_bytes: 5 }
        );
    }

    #[test]
    fn status_text_only_for_percentages() {
        assert_eq!(
            Progress::Percent(40).status_text().as_deref(),
            Some("Loading model: 40%")
        );
        assert_eq!(Progress::Indeterminate { loaded_bytes: 9 }.status_text(), None);
    }

    #[tokio::test]
    async fn fetch_reports_progress_up_to_completion() {
        let payload = vec![7u8; 4096];
        let body = payload.clone();
        let app = Router::new().route("/car.glb", get(move || async move { body }));
        let base = serve(app).await;

        let fetcher = HttpAssetFetcher::new();
        let mut seen = Vec::new();
        let url = format!("{base}/car.glb");
        let bytes = fetcher
            .fetch(&url, &mut |p| seen.push(p))
            .await
            .expect("fetch");

        assert_eq!(bytes, payload);
        assert_eq!(seen.first(), Some(&Progress::Percent(0)));
        assert_eq!(seen.last(), Some(&Progress::Percent(100)));
    }

    #[tokio::test]
    async fn fetch_maps_missing_asset() {
        let base = serve(Router::new()).await;
        let fetcher = HttpAssetFetcher::new();
        let url = format!("{base}/nope.glb");
        let err = fetcher.fetch(&url, &mut |_| {}).await.expect_err("404");
        assert_eq!(err, AcquisitionError::NotFound);
    }

    #[tokio::test]
    async fn closed_port_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let fetcher = HttpAssetFetcher::new();
        let url = format!("http://{addr}/x.glb");
        let err = fetcher.fetch(&url, &mut |_| {}).await.expect_err("refused");
        assert!(matches!(err, AcquisitionError::Transport(_)));
    }

    #[tokio::test]
    async fn broken_body_stream_is_a_transport_error() {
        let app = Router::new().route(
            "/x.glb",
            get(|| async {
                let chunks = futures_util::stream::iter(vec![
                    Ok(vec![1u8; 64]),
                    Err(std::io::Error::other("connection reset")),
                ]);
                Body::from_stream(chunks)
            }),
        );
        let base = serve(app).await;

        let fetcher = HttpAssetFetcher::new();
        let url = format!("{base}/x.glb");
        let err = fetcher.fetch(&url, &mut |_| {}).await.expect_err("interrupted");
        assert!(matches!(err, AcquisitionError::Transport(_)));
    }

    #[tokio::test]
    async fn memory_fetcher_serves_inserted_assets() {
        let fetcher = MemoryAssetFetcher::new().with_asset("mem://a", vec![1, 2, 3]);
        let mut seen = Vec::new();
        let bytes = fetcher.fetch("mem://a", &mut |p| seen.push(p)).await.expect("a");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(seen, vec![Progress::Percent(100)]);
        assert_eq!(
            fetcher.fetch("mem://b", &mut |_| {}).await,
            Err(AcquisitionError::NotFound)
        );
    }
}
