//! Browser entry points.
//!
//! The session lives in a thread-local and is only borrowed for synchronous
//! steps. Loads run on `spawn_local` and never hold the borrow across an
//! `.await`.

use std::cell::RefCell;
use std::collections::HashMap;

use console_error_panic_hook::set_once;
use foundation::math::{Mat4, Projection, WebMercator};
use gloo_net::http::Request;
use gpu::SceneRenderer;
use js_sys::{Float64Array, Uint8Array};
use layers::{HostError, LayerId, MapHost, MapOptions, MapProvider};
use scene::{Light, SceneRoot};
use streaming::{
    AcquisitionError, AssetFetcher, CacheKey, Credential, LoadedScene, LocalBoxFuture,
    ModelSource, PendingLoad, Progress, SketchfabApi, acquire, error_for_status,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::config::ViewerConfig;
use crate::session::{LoadOutcome, LoadTicket, Session};

#[wasm_bindgen(inline_js = "
let map = null;
const scenes = new Map();
let gltfLoader = null;

function engine(provider) {
    return provider === 'maplibre' ? globalThis.maplibregl : globalThis.mapboxgl;
}

// three.js before r148 ships `THREE.GLTFLoader` as a global script; later
// releases only as a module, which the page maps under `three/addons/`.
async function loader() {
    if (!gltfLoader) {
        const Loader = THREE.GLTFLoader
            || (await import('three/addons/loaders/GLTFLoader.js')).GLTFLoader;
        gltfLoader = new Loader();
    }
    return gltfLoader;
}

function styleMap(m, provider) {
    for (const layer of m.getStyle().layers) {
        if (layer.type === 'fill-extrusion' && layer.id.includes('building')) {
            m.setPaintProperty(layer.id, 'fill-extrusion-opacity', 0.8);
        }
    }
    if (provider === 'mapbox' && !m.getLayer('sky')) {
        m.addLayer({
            id: 'sky',
            type: 'sky',
            paint: {
                'sky-type': 'atmosphere',
                'sky-atmosphere-sun': [0.0, 90.0],
                'sky-atmosphere-sun-intensity': 15,
            },
        });
    }
}

export function atlas_map_init(optionsJson, onLoad, onError) {
    const o = JSON.parse(optionsJson);
    const gl = engine(o.provider);
    if (!gl) throw new Error(`${o.provider} is not loaded on this page`);
    if (o.access_token) gl.accessToken = o.access_token;
    map = new gl.Map({
        container: 'map',
        style: o.style,
        zoom: o.zoom,
        center: o.center,
        pitch: o.pitch,
        bearing: o.bearing,
        antialias: o.antialias,
    });
    map.addControl(new gl.NavigationControl(), 'top-right');
    map.on('style.load', () => {
        styleMap(map, o.provider);
        onLoad();
    });
    map.on('error', (e) => onError(String((e && e.error && e.error.message) || e)));
}

export function atlas_map_teardown() {
    scenes.clear();
    if (map) map.remove();
    map = null;
}

export function atlas_map_add_custom_layer(id, onRender) {
    if (!map) throw new Error('map is not initialized');
    const entry = {
        camera: new THREE.Camera(),
        scene: new THREE.Scene(),
        renderer: null,
        model: null,
        lights: 0,
    };
    scenes.set(id, entry);
    map.addLayer({
        id,
        type: 'custom',
        renderingMode: '3d',
        onAdd(m, gl) {
            entry.renderer = new THREE.WebGLRenderer({
                canvas: m.getCanvas(),
                context: gl,
                antialias: true,
            });
            entry.renderer.autoClear = false;
        },
        render(gl, matrix) {
            onRender(id, Float64Array.from(matrix));
        },
    });
}

export function atlas_map_remove_layer(id) {
    scenes.delete(id);
    if (!map || !map.getLayer(id)) return false;
    map.removeLayer(id);
    return true;
}

export function atlas_map_has_layer(id) {
    return !!(map && map.getLayer(id));
}

export function atlas_map_trigger_repaint() {
    if (map) map.triggerRepaint();
}

// `bytes` owns its buffer; `onDone` runs exactly once, with null or an
// error message.
export function atlas_scene_set_model(id, bytes, path, onDone) {
    let done = false;
    const finish = (err) => {
        if (done) return;
        done = true;
        onDone(err == null ? null : String((err && err.message) || err));
    };
    const entry = scenes.get(id);
    if (!entry) return finish(null);
    loader()
        .then((l) => l.parse(bytes.buffer, path, (gltf) => {
            if (scenes.get(id) === entry) {
                if (entry.model) entry.scene.remove(entry.model);
                entry.model = gltf.scene;
                entry.scene.add(gltf.scene);
                if (map) map.triggerRepaint();
            }
            finish(null);
        }, finish))
        .catch(finish);
}

export function atlas_scene_reset_state(id) {
    const entry = scenes.get(id);
    if (entry && entry.renderer) entry.renderer.resetState();
}

export function atlas_scene_render(id, camera, rootScale, lights) {
    const entry = scenes.get(id);
    if (!entry || !entry.renderer) return;
    if (entry.lights === 0) {
        for (let i = 0; i < lights.length; i += 6) {
            const [kind, color, intensity, x, y, z] = lights.slice(i, i + 6);
            const light = kind === 0
                ? new THREE.DirectionalLight(color, intensity)
                : new THREE.AmbientLight(color, intensity);
            if (kind === 0) light.position.set(x, y, z).normalize();
            entry.scene.add(light);
            entry.lights += 1;
        }
    }
    if (entry.model) entry.model.scale.setScalar(rootScale);
    entry.camera.projectionMatrix = new THREE.Matrix4().fromArray(camera);
    entry.renderer.render(entry.scene, entry.camera);
}

export function atlas_status(severity, message) {
    const el = document.getElementById('status');
    if (!el) return;
    el.textContent = message;
    el.className = `status ${severity}`;
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn atlas_map_init(
        options_json: &str,
        on_load: &JsValue,
        on_error: &JsValue,
    ) -> Result<(), JsValue>;

    fn atlas_map_teardown();

    #[wasm_bindgen(catch)]
    fn atlas_map_add_custom_layer(id: &str, on_render: &JsValue) -> Result<(), JsValue>;

    fn atlas_map_remove_layer(id: &str) -> bool;

    fn atlas_map_has_layer(id: &str) -> bool;

    fn atlas_map_trigger_repaint();

    fn atlas_scene_set_model(id: &str, bytes: Uint8Array, path: &str, on_done: JsValue);

    fn atlas_scene_reset_state(id: &str);

    fn atlas_scene_render(id: &str, camera: &[f64], root_scale: f64, lights: &[f64]);

    fn atlas_status(severity: &str, message: &str);
}

type RenderCallback = Closure<dyn FnMut(String, Float64Array)>;

/// Map engine reached through the page's `mapboxgl`/`maplibregl` global.
#[derive(Default)]
struct JsMapHost {
    projection: WebMercator,
    on_load: Option<Closure<dyn FnMut()>>,
    on_error: Option<Closure<dyn FnMut(String)>>,
    on_render: HashMap<LayerId, RenderCallback>,
}

impl MapHost for JsMapHost {
    fn initialize(&mut self, options: &MapOptions) -> Result<(), HostError> {
        if self.on_load.is_some() {
            return Err(HostError::AlreadyInitialized);
        }
        let json = serde_json::to_string(options).map_err(|e| HostError::Engine(e.to_string()))?;

        let on_load = Closure::<dyn FnMut()>::new(|| {
            with_session_quiet(|s| {
                s.on_style_loaded();
            });
        });
        let on_error = Closure::<dyn FnMut(String)>::new(|message: String| {
            with_session_quiet(|s| s.on_map_error(&message));
        });
        atlas_map_init(&json, on_load.as_ref(), on_error.as_ref())
            .map_err(|e| HostError::Engine(js_error(&e)))?;

        self.on_load = Some(on_load);
        self.on_error = Some(on_error);
        Ok(())
    }

    fn teardown(&mut self) {
        atlas_map_teardown();
        self.on_render.clear();
        self.on_load = None;
        self.on_error = None;
    }

    fn add_custom_layer(&mut self, id: &LayerId) -> Result<(), HostError> {
        if self.on_load.is_none() {
            return Err(HostError::NotInitialized);
        }
        if self.on_render.contains_key(id) {
            return Err(HostError::DuplicateLayer(id.clone()));
        }
        let callback = RenderCallback::new(|id: String, matrix: Float64Array| {
            render_frame(&id, &matrix.to_vec());
        });
        atlas_map_add_custom_layer(id.as_str(), callback.as_ref())
            .map_err(|e| HostError::Engine(js_error(&e)))?;
        self.on_render.insert(id.clone(), callback);
        Ok(())
    }

    fn remove_layer(&mut self, id: &LayerId) -> bool {
        let removed = atlas_map_remove_layer(id.as_str());
        self.on_render.remove(id);
        removed
    }

    fn has_layer(&self, id: &LayerId) -> bool {
        atlas_map_has_layer(id.as_str())
    }

    fn trigger_repaint(&mut self) {
        atlas_map_trigger_repaint();
    }

    fn projection(&self) -> &dyn Projection {
        &self.projection
    }
}

/// Forwards draws to the page's three.js scene for the current layer.
#[derive(Debug, Default)]
struct JsSceneRenderer {
    target: Option<LayerId>,
}

impl JsSceneRenderer {
    fn light_data(scene: &SceneRoot) -> Vec<f64> {
        scene
            .lights()
            .iter()
            .flat_map(|light| match light {
                Light::Directional {
                    color,
                    intensity,
                    direction,
                } => [0.0, *color as f64, *intensity, direction.x, direction.y, direction.z],
                Light::Ambient { color, intensity } => {
                    [1.0, *color as f64, *intensity, 0.0, 0.0, 0.0]
                }
            })
            .collect()
    }
}

impl SceneRenderer for JsSceneRenderer {
    fn reset_state(&mut self) {
        if let Some(id) = &self.target {
            atlas_scene_reset_state(id.as_str());
        }
    }

    fn render(&mut self, scene: &SceneRoot, camera: &Mat4) {
        let Some(id) = &self.target else {
            return;
        };
        let root_scale = scene
            .models()
            .first()
            .map(|m| m.root_transform().scale.x)
            .unwrap_or(1.0);
        atlas_scene_render(
            id.as_str(),
            &camera.to_col_major_array(),
            root_scale,
            &Self::light_data(scene),
        );
    }
}

/// Fetches asset bytes with the browser's `fetch`. The body arrives in one
/// piece, so progress jumps from 0 to 100.
struct GlooAssetFetcher;

impl AssetFetcher for GlooAssetFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AcquisitionError>> {
        Box::pin(async move {
            let resp = Request::get(url)
                .send()
                .await
                .map_err(|e| AcquisitionError::Transport(format!("download failed: {e}")))?;
            let status_text = resp.status_text();
            if let Some(err) = error_for_status(resp.status(), Some(&status_text)) {
                return Err(err);
            }
            let total = resp
                .headers()
                .get("content-length")
                .and_then(|v| v.parse::<u64>().ok());
            on_progress(Progress::from_bytes(0, total));
            let bytes = resp
                .binary()
                .await
                .map_err(|e| AcquisitionError::Transport(format!("download interrupted: {e}")))?;
            on_progress(Progress::from_bytes(bytes.len() as u64, Some(bytes.len() as u64)));
            Ok(bytes)
        })
    }
}

/// Keeps the bytes of the most recent asset so a cached scene can be
/// handed to a freshly mounted layer.
struct RetainingFetcher {
    inner: GlooAssetFetcher,
    last: RefCell<Option<Vec<u8>>>,
}

impl AssetFetcher for RetainingFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AcquisitionError>> {
        Box::pin(async move {
            let bytes = self.inner.fetch(url, on_progress).await?;
            *self.last.borrow_mut() = Some(bytes.clone());
            Ok(bytes)
        })
    }
}

type BrowserSession = Session<JsMapHost, JsSceneRenderer>;

/// Bytes of the scene in the cache, kept for the page's rasterizer.
struct ModelAsset {
    key: CacheKey,
    /// Base the asset's relative buffer and image URIs resolve against.
    resource_base: String,
    bytes: Vec<u8>,
}

thread_local! {
    static SESSION: RefCell<Option<BrowserSession>> = const { RefCell::new(None) };
    static MODEL_ASSET: RefCell<Option<ModelAsset>> = const { RefCell::new(None) };
}

fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

fn flush_status(session: &mut BrowserSession) {
    for message in session.status_mut().drain() {
        atlas_status(message.severity.as_str(), &message.message);
    }
}

fn with_session<T>(f: impl FnOnce(&mut BrowserSession) -> T) -> Result<T, JsValue> {
    SESSION.with(|slot| {
        let mut slot = slot
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("viewer is busy"))?;
        let session = slot
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer is not started"))?;
        let out = f(session);
        flush_status(session);
        Ok(out)
    })
}

/// For engine callbacks, which have nowhere to report errors.
fn with_session_quiet(f: impl FnOnce(&mut BrowserSession)) {
    if let Err(e) = with_session(f) {
        log(&format!("viewer callback skipped: {}", js_error(&e)));
    }
}

fn render_frame(layer: &str, matrix: &[f64]) {
    let Some(view) = Mat4::from_col_major_slice(matrix) else {
        log("render skipped: bad view matrix");
        return;
    };
    with_session_quiet(|s| {
        if s.layer_id().map(LayerId::as_str) != Some(layer) {
            return;
        }
        s.render_frame(&view);
    });
}

fn sync_render_target(session: &mut BrowserSession) -> Option<LayerId> {
    let id = session.layer_id().cloned();
    session.renderer_mut().target = id.clone();
    id
}

/// Hand the cached asset to the rasterizer of `layer`. A parse failure on
/// the JS side comes back through the session as a decode error.
fn upload_model(layer: &LayerId, key: &CacheKey) {
    MODEL_ASSET.with(|slot| {
        let slot = slot.borrow();
        let Some(asset) = slot.as_ref().filter(|a| &a.key == key) else {
            return;
        };
        let failed_layer = layer.clone();
        let on_done = Closure::once_into_js(move |error: Option<String>| {
            let Some(reason) = error else {
                return;
            };
            log(&format!("rasterizer rejected model: {reason}"));
            MODEL_ASSET.with(|slot| *slot.borrow_mut() = None);
            with_session_quiet(|s| {
                if s.on_model_display_failed(&failed_layer, &reason) {
                    sync_render_target(s);
                }
            });
        });
        atlas_scene_set_model(
            layer.as_str(),
            Uint8Array::from(asset.bytes.as_slice()),
            &asset.resource_base,
            on_done,
        );
    });
}

fn start_load(source: ModelSource) {
    let pending = match with_session(|s| {
        let pending = s.begin_load(source);
        sync_render_target(s);
        pending.map(|p| (p, s.config().sketchfab_api_url.clone()))
    }) {
        Ok(Ok(pending)) => pending,
        Ok(Err(e)) => return log(&format!("load rejected: {e}")),
        Err(e) => return log(&js_error(&e)),
    };

    spawn_local(async move {
        let (PendingLoad { ticket, plan }, api_url) = pending;
        let api = SketchfabApi::with_base_url(api_url);
        let fetcher = RetainingFetcher {
            inner: GlooAssetFetcher,
            last: RefCell::new(None),
        };
        let result = acquire(&api, &fetcher, plan, &mut |event| {
            with_session_quiet(|s| s.on_acquire_event(&ticket, event));
        })
        .await;
        finish_load(ticket, result, fetcher.last.into_inner());
    });
}

fn finish_load(
    ticket: LoadTicket,
    result: Result<LoadedScene, AcquisitionError>,
    bytes: Option<Vec<u8>>,
) {
    let key = ticket.key.clone();
    let resource_base = result
        .as_ref()
        .map(|loaded| loaded.resource_base().to_string())
        .unwrap_or_default();
    let outcome = with_session(|s| {
        let outcome = s.complete_load(ticket, result);
        (outcome, sync_render_target(s))
    });
    match outcome {
        Ok((Ok(LoadOutcome::Loaded), Some(layer))) => {
            if let Some(bytes) = bytes {
                let asset = ModelAsset {
                    key: key.clone(),
                    resource_base,
                    bytes,
                };
                MODEL_ASSET.with(|slot| *slot.borrow_mut() = Some(asset));
            }
            upload_model(&layer, &key);
        }
        Ok((Ok(_), _)) => {}
        Ok((Err(e), _)) => log(&format!("load failed: {e}")),
        Err(e) => log(&js_error(&e)),
    }
}

#[wasm_bindgen(start)]
pub fn viewer_start() -> Result<(), JsValue> {
    set_once();
    SESSION.with(|slot| {
        *slot.borrow_mut() = Some(Session::new(
            JsMapHost::default(),
            JsSceneRenderer::default(),
            ViewerConfig::default(),
        ));
    });
    Ok(())
}

/// Replace the configuration. Tears down any existing map.
#[wasm_bindgen]
pub fn viewer_configure(config_json: &str) -> Result<(), JsValue> {
    let config =
        ViewerConfig::from_json_str(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    SESSION.with(|slot| {
        let mut slot = slot
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("viewer is busy"))?;
        if let Some(session) = slot.as_mut() {
            session.reset();
        }
        *slot = Some(Session::new(
            JsMapHost::default(),
            JsSceneRenderer::default(),
            config,
        ));
        Ok(())
    })
}

fn parse_provider(name: &str) -> Result<MapProvider, JsValue> {
    MapProvider::from_name(name)
        .ok_or_else(|| JsValue::from_str(&format!("unknown map provider {name:?}")))
}

#[wasm_bindgen]
pub fn viewer_init_map(provider: &str, token: Option<String>) -> Result<(), JsValue> {
    let provider = parse_provider(provider)?;
    let credential = Credential::non_blank(token.as_deref());
    with_session(|s| s.initialize_map(provider, credential))?
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn viewer_reset_map(provider: &str, token: Option<String>) -> Result<(), JsValue> {
    let provider = parse_provider(provider)?;
    let credential = Credential::non_blank(token.as_deref());
    MODEL_ASSET.with(|slot| *slot.borrow_mut() = None);
    with_session(|s| s.reset_and_initialize(provider, credential))?
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn viewer_load_default() {
    start_load(ModelSource::Default);
}

#[wasm_bindgen]
pub fn viewer_load_sketchfab(uid: &str, token: &str, password: Option<String>) {
    let source = ModelSource::remote(
        uid.trim(),
        Credential::new(token.trim()),
        Credential::non_blank(password.as_deref()),
    );
    start_load(source);
}

#[wasm_bindgen]
pub fn viewer_load_url(url: &str) {
    start_load(ModelSource::Url(url.trim().to_string()));
}

#[wasm_bindgen]
pub fn viewer_remove_model() -> Result<bool, JsValue> {
    with_session(|s| {
        let removed = s.remove_model();
        sync_render_target(s);
        removed
    })
}

#[wasm_bindgen]
pub fn viewer_start_animation(name: &str) -> Result<(), JsValue> {
    let started = with_session(|s| {
        let started = s.start_animation_by_name(name);
        let layer = sync_render_target(s);
        let key = s.cache().key().cloned();
        started.map(|()| (layer, key))
    })?;
    match started {
        Ok((Some(layer), Some(key))) => {
            upload_model(&layer, &key);
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => Err(JsValue::from_str(&e.to_string())),
    }
}

#[wasm_bindgen]
pub fn viewer_stop_animation() -> Result<bool, JsValue> {
    with_session(|s| s.stop_animation())
}

#[wasm_bindgen]
pub fn viewer_state() -> Result<String, JsValue> {
    with_session(|s| format!("{:?}", s.state()))
}
