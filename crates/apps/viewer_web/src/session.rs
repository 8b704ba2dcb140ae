//! Viewer lifecycle: map initialization, model loading, animation and
//! removal as one explicit state machine.
//!
//! Loading is split into a synchronous [`Session::begin_load`], the async
//! [`streaming::acquire`] step, and a synchronous [`Session::complete_load`].
//! The browser bindings cannot hold the session across an `.await`, so they
//! drive the three steps themselves; native callers use
//! [`Session::load_model`].

use std::fmt;

use foundation::geo::{
    DEFAULT_MODEL_ROTATION, GeographicAnchor, InvalidAnchorError, build_initial_placement,
};
use foundation::math::Mat4;
use gpu::SceneRenderer;
use layers::{
    HostError, Layer, LayerError, LayerId, LayerIdGenerator, MapHost, MapOptions, MapProvider,
    ModelLayer,
};
use runtime::animation::{AnimationDriver, AnimationKind};
use runtime::frame::FrameClock;
use runtime::status::{Severity, StatusBus};
use scene::SceneGraph;
use streaming::{
    AcquireEvent, AcquisitionError, AssetFetcher, CacheKey, Credential, LoadPlan, LoadedScene,
    ModelApi, ModelSource, Request, RequestTracker, SceneCache, URL_PROVIDER, acquire,
};

use crate::config::ViewerConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    MapUninitialized,
    /// The engine was created and is loading its style.
    MapInitializing,
    MapReady,
    ModelLoading,
    ModelReady,
    Animating,
}

impl SessionState {
    pub fn is_map_ready(self) -> bool {
        !matches!(
            self,
            SessionState::MapUninitialized | SessionState::MapInitializing
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    MapNotReady,
    NoModelLoaded,
    MissingMapCredential,
    MissingModelCredentials,
    ProviderSwitchRequiresReset {
        current: MapProvider,
        requested: MapProvider,
    },
    UnknownAnimation(String),
    InvalidAnchor(InvalidAnchorError),
    Layer(LayerError),
    Map(HostError),
    Acquisition(AcquisitionError),
}

impl SessionError {
    pub fn severity(&self) -> Severity {
        match self {
            SessionError::ProviderSwitchRequiresReset { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MapNotReady => write!(f, "Please initialize the map first"),
            SessionError::NoModelLoaded => write!(f, "Please load a model first"),
            SessionError::MissingMapCredential => write!(f, "Mapbox API token is required"),
            SessionError::MissingModelCredentials => {
                write!(f, "Please enter Sketchfab UID and API Token")
            }
            SessionError::ProviderSwitchRequiresReset { current, requested } => write!(
                f,
                "Map already initialized with {current}; reset it before switching to {requested}"
            ),
            SessionError::UnknownAnimation(name) => {
                write!(f, "Animation type \"{name}\" not found")
            }
            SessionError::InvalidAnchor(e) => write!(f, "Invalid model anchor: {e}"),
            SessionError::Layer(e) => write!(f, "Failed to add model layer: {e}"),
            SessionError::Map(_) => {
                write!(f, "Failed to initialize map. Please check your API token.")
            }
            SessionError::Acquisition(e) => write!(f, "Failed to load model: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<InvalidAnchorError> for SessionError {
    fn from(value: InvalidAnchorError) -> Self {
        SessionError::InvalidAnchor(value)
    }
}

impl From<LayerError> for SessionError {
    fn from(value: LayerError) -> Self {
        SessionError::Layer(value)
    }
}

/// Identifies an in-flight load when it completes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub request: Request,
    pub source: ModelSource,
    pub key: CacheKey,
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub ticket: LoadTicket,
    pub plan: LoadPlan,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// A newer request (or a removal/reset) replaced this one.
    Superseded,
}

pub struct Session<H: MapHost, R: SceneRenderer> {
    host: H,
    renderer: R,
    config: ViewerConfig,
    state: SessionState,
    provider: Option<MapProvider>,
    anchor: GeographicAnchor,
    rotation: [f64; 3],
    layer: Option<ModelLayer>,
    layer_ids: LayerIdGenerator,
    driver: AnimationDriver,
    cache: SceneCache,
    loaded_source: Option<ModelSource>,
    requests: RequestTracker,
    clock: FrameClock,
    status: StatusBus,
}

impl<H: MapHost, R: SceneRenderer> Session<H, R> {
    pub fn new(host: H, renderer: R, config: ViewerConfig) -> Self {
        Self {
            host,
            renderer,
            config,
            state: SessionState::MapUninitialized,
            provider: None,
            anchor: GeographicAnchor::default_anchor(),
            rotation: DEFAULT_MODEL_ROTATION,
            layer: None,
            layer_ids: LayerIdGenerator::new(),
            driver: AnimationDriver::new(),
            cache: SceneCache::new(),
            loaded_source: None,
            requests: RequestTracker::new(),
            clock: FrameClock::new(),
            status: StatusBus::new(),
        }
    }

    /// Pin future models to `anchor` instead of the default anchor.
    pub fn with_anchor(mut self, anchor: GeographicAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn provider(&self) -> Option<MapProvider> {
        self.provider
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn layer(&self) -> Option<&ModelLayer> {
        self.layer.as_ref()
    }

    pub fn layer_id(&self) -> Option<&LayerId> {
        self.layer.as_ref().map(|l| l.id())
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    pub fn cache(&self) -> &SceneCache {
        &self.cache
    }

    pub fn loaded_source(&self) -> Option<&ModelSource> {
        self.loaded_source.as_ref()
    }

    pub fn status(&self) -> &StatusBus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusBus {
        &mut self.status
    }

    pub fn is_map_ready(&self) -> bool {
        self.state.is_map_ready()
    }

    /// Create the map. Readiness arrives later through
    /// [`Session::on_style_loaded`].
    pub fn initialize_map(
        &mut self,
        provider: MapProvider,
        credential: Option<Credential>,
    ) -> Result<(), SessionError> {
        if let Some(current) = self.provider {
            if current == provider {
                return Ok(());
            }
            return Err(self.fail(SessionError::ProviderSwitchRequiresReset {
                current,
                requested: provider,
            }));
        }

        let credential = credential.filter(|c| !c.is_blank());
        if provider.requires_credential() && credential.is_none() {
            return Err(self.fail(SessionError::MissingMapCredential));
        }

        let options =
            MapOptions::for_provider(provider, credential.map(|c| c.expose().to_string()));
        if let Err(e) = self.host.initialize(&options) {
            return Err(self.fail(SessionError::Map(e)));
        }

        tracing::info!(%provider, style = %options.style, "map initializing");
        self.provider = Some(provider);
        self.state = SessionState::MapInitializing;
        Ok(())
    }

    /// Initialize with the provider and token from the configuration.
    pub fn initialize_from_config(&mut self) -> Result<(), SessionError> {
        let provider = self.config.map_provider;
        let credential = self.config.map_credential();
        self.initialize_map(provider, credential)
    }

    /// The engine finished loading its style. Returns `false` if the session
    /// was not waiting for it.
    pub fn on_style_loaded(&mut self) -> bool {
        if self.state != SessionState::MapInitializing {
            return false;
        }
        self.state = SessionState::MapReady;
        self.emit(Severity::Success, "Map initialized successfully!");
        true
    }

    /// The engine reported an error. While initializing this aborts the
    /// map; afterwards it is only reported.
    pub fn on_map_error(&mut self, message: &str) {
        if self.state == SessionState::MapInitializing {
            tracing::error!(%message, "map failed to initialize");
            self.reset();
            self.emit(
                Severity::Error,
                "Failed to initialize map. Please check your API token.",
            );
        } else {
            self.emit(Severity::Warning, format!("Map error: {message}"));
        }
    }

    /// Return to `MapUninitialized`, dropping the map, the model and all
    /// cached state.
    pub fn reset(&mut self) {
        self.driver.stop();
        self.requests.invalidate();
        self.unmount_layer();
        self.host.teardown();
        self.cache.clear();
        self.loaded_source = None;
        self.provider = None;
        self.state = SessionState::MapUninitialized;
    }

    pub fn reset_and_initialize(
        &mut self,
        provider: MapProvider,
        credential: Option<Credential>,
    ) -> Result<(), SessionError> {
        self.reset();
        self.initialize_map(provider, credential)
    }

    /// Start loading `source`: validates, replaces any mounted layer with an
    /// empty one and decides whether the scene can come from the cache.
    pub fn begin_load(&mut self, source: ModelSource) -> Result<PendingLoad, SessionError> {
        if !self.is_map_ready() {
            return Err(self.fail(SessionError::MapNotReady));
        }
        if let ModelSource::Remote {
            identifier,
            credential,
            ..
        } = &source
            && (identifier.trim().is_empty() || credential.is_blank())
        {
            return Err(self.fail(SessionError::MissingModelCredentials));
        }

        let key = self.cache_key_for(&source);
        let cached = self.cache.clone_for_remount(&key);
        let plan = match (cached, &source) {
            (Some(graph), _) => LoadPlan::Cached(graph),
            (None, ModelSource::Cached(_)) => return Err(self.fail(SessionError::NoModelLoaded)),
            (
                None,
                ModelSource::Remote {
                    identifier,
                    credential,
                    password,
                },
            ) => LoadPlan::Remote {
                identifier: identifier.trim().to_string(),
                credential: credential.clone(),
                password: password.clone(),
            },
            (None, ModelSource::Default) => LoadPlan::Url(self.config.default_model_url.clone()),
            (None, ModelSource::Url(url)) => LoadPlan::Url(url.trim().to_string()),
        };
        let from_cache = matches!(plan, LoadPlan::Cached(_));

        self.driver.stop();
        self.unmount_layer();
        let request = self.requests.begin();
        if let Err(e) = self.mount_layer(None) {
            self.requests.invalidate();
            self.state = SessionState::MapReady;
            return Err(self.fail(e));
        }
        self.state = SessionState::ModelLoading;

        let message = match (&plan, &source) {
            (LoadPlan::Cached(_), _) => "Loading cached model...",
            (_, ModelSource::Remote { .. }) => "Fetching model from Sketchfab...",
            (_, ModelSource::Default) => "Loading default model...",
            _ => "Loading model...",
        };
        self.emit(Severity::Loading, message);
        tracing::info!(request = request.0, %source, from_cache, "load started");

        Ok(PendingLoad {
            ticket: LoadTicket {
                request,
                source,
                key,
                from_cache,
            },
            plan,
        })
    }

    /// Forward an acquisition event to the status line. Events of
    /// superseded requests are dropped.
    pub fn on_acquire_event(&mut self, ticket: &LoadTicket, event: AcquireEvent) {
        if !self.requests.is_current(ticket.request) {
            return;
        }
        match event {
            AcquireEvent::Resolving => {}
            AcquireEvent::Resolved(url) => {
                tracing::debug!(%url, "download URL resolved");
                self.emit(
                    Severity::Success,
                    "Model URL retrieved successfully! Loading model...",
                );
            }
            AcquireEvent::Progress(progress) => {
                if let Some(text) = progress.status_text() {
                    self.emit(Severity::Loading, text);
                }
            }
        }
    }

    /// Finish a load started by [`Session::begin_load`].
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedScene, AcquisitionError>,
    ) -> Result<LoadOutcome, SessionError> {
        if !self.requests.finish(ticket.request) {
            tracing::debug!(request = ticket.request.0, "discarding superseded load");
            return Ok(LoadOutcome::Superseded);
        }

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                self.unmount_layer();
                self.state = SessionState::MapReady;
                let prefix = if ticket.source.is_remote() && !ticket.from_cache {
                    "Failed to download model"
                } else {
                    "Failed to load model"
                };
                self.emit(Severity::Error, format!("{prefix}: {err}"));
                return Err(SessionError::Acquisition(err));
            }
        };

        let Some(layer) = self.layer.as_mut() else {
            return Ok(LoadOutcome::Superseded);
        };
        if !loaded.from_cache {
            self.cache.store(ticket.key, loaded.graph.clone());
        }
        layer.insert_model(loaded.graph);
        self.loaded_source = Some(ticket.source);
        self.state = SessionState::ModelReady;
        self.emit(Severity::Success, "Model loaded successfully!");
        Ok(LoadOutcome::Loaded)
    }

    /// Load `source` end to end.
    pub async fn load_model(
        &mut self,
        api: &dyn ModelApi,
        fetcher: &dyn AssetFetcher,
        source: ModelSource,
    ) -> Result<LoadOutcome, SessionError> {
        let PendingLoad { ticket, plan } = self.begin_load(source)?;
        let result = acquire(api, fetcher, plan, &mut |event| {
            self.on_acquire_event(&ticket, event)
        })
        .await;
        self.complete_load(ticket, result)
    }

    pub async fn load_default_model(
        &mut self,
        api: &dyn ModelApi,
        fetcher: &dyn AssetFetcher,
    ) -> Result<LoadOutcome, SessionError> {
        self.load_model(api, fetcher, ModelSource::Default).await
    }

    /// Start `kind`, remounting the cached model first when the animation
    /// needs a fresh layer.
    pub fn start_animation(&mut self, kind: AnimationKind) -> Result<(), SessionError> {
        if !self.is_map_ready() {
            return Err(self.fail(SessionError::MapNotReady));
        }
        let Some(key) = self
            .loaded_source
            .as_ref()
            .map(|source| self.cache_key_for(source))
            .filter(|key| self.cache.contains(key))
        else {
            return Err(self.fail(SessionError::NoModelLoaded));
        };

        if kind.requires_remount() {
            self.driver.stop();
            self.unmount_layer();
            self.requests.invalidate();
            let graph = self.cache.clone_for_remount(&key);
            if let Err(e) = self.mount_layer(graph) {
                self.state = SessionState::MapReady;
                return Err(self.fail(e));
            }
        } else if self.layer.is_none() {
            return Err(self.fail(SessionError::NoModelLoaded));
        }

        self.driver.start(kind);
        self.state = SessionState::Animating;
        self.emit(
            Severity::Success,
            format!("Starting {} animation...", kind.display_name()),
        );
        Ok(())
    }

    pub fn start_animation_by_name(&mut self, name: &str) -> Result<(), SessionError> {
        match AnimationKind::from_name(name) {
            Some(kind) => self.start_animation(kind),
            None => Err(self.fail(SessionError::UnknownAnimation(name.to_string()))),
        }
    }

    /// Stop the running animation and put the model back at its initial
    /// placement. The layer stays mounted.
    pub fn stop_animation(&mut self) -> bool {
        if !self.driver.stop() {
            return false;
        }
        if let Some(layer) = self.layer.as_mut() {
            layer.reset_transform();
            self.state = SessionState::ModelReady;
        } else {
            self.state = SessionState::MapReady;
        }
        self.emit(Severity::Info, "Animation stopped");
        true
    }

    /// Remove the mounted model. The cache is kept so the model can be
    /// shown again without downloading it.
    pub fn remove_model(&mut self) -> bool {
        self.driver.stop();
        self.requests.invalidate();
        let removed = self.unmount_layer();
        if self.is_map_ready() {
            self.state = SessionState::MapReady;
        }
        if removed {
            self.emit(Severity::Success, "Model removed");
        } else {
            self.emit(Severity::Warning, "No model to remove");
        }
        removed
    }

    /// The host's rasterizer could not build the model it was handed for
    /// `layer`. The layer comes down and the cached scene is dropped, since
    /// it cannot be shown. Stale layers are ignored.
    pub fn on_model_display_failed(&mut self, layer: &LayerId, reason: &str) -> bool {
        if self.layer_id() != Some(layer) {
            tracing::debug!(%layer, "ignoring display failure for stale layer");
            return false;
        }
        self.driver.stop();
        self.requests.invalidate();
        self.unmount_layer();
        self.cache.clear();
        self.loaded_source = None;
        self.state = SessionState::MapReady;
        let err = SessionError::Acquisition(AcquisitionError::AssetDecode(reason.to_string()));
        self.fail(err);
        true
    }

    /// The host's per-draw entry point. Returns the camera matrix used, or
    /// `None` when nothing is mounted.
    pub fn render_frame(&mut self, view: &Mat4) -> Option<Mat4> {
        self.clock.tick();
        let layer = self.layer.as_mut()?;
        Some(layer.render(view, &mut self.driver, &mut self.renderer, &mut self.host))
    }

    fn cache_key_for(&self, source: &ModelSource) -> CacheKey {
        match source {
            ModelSource::Default => {
                CacheKey::new(URL_PROVIDER, self.config.default_model_url.trim())
            }
            other => other.cache_key(),
        }
    }

    /// Mount a new layer at the anchor. Any previous layer is unmounted
    /// first, so the host never holds two.
    fn mount_layer(&mut self, model: Option<SceneGraph>) -> Result<(), SessionError> {
        self.unmount_layer();
        let placement =
            build_initial_placement(&self.anchor, self.rotation, self.host.projection())?;
        let id = self.layer_ids.next_id();
        let layer = ModelLayer::mount(&mut self.host, id, self.anchor, placement, |root| {
            if let Some(model) = model {
                root.add_model(model);
            }
        })?;
        tracing::debug!(layer = %layer.id(), "layer mounted");
        self.layer = Some(layer);
        Ok(())
    }

    fn unmount_layer(&mut self) -> bool {
        match self.layer.take() {
            Some(layer) => layer.unmount(&mut self.host),
            None => false,
        }
    }

    fn emit(&mut self, severity: Severity, message: impl Into<String>) {
        let frame = self.clock.current();
        self.status.emit(frame, severity, message);
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.emit(err.severity(), err.to_string());
        err
    }
}
