use std::error::Error;

use clap::{Parser, Subcommand};
use foundation::geo::{
    DEFAULT_ANCHOR_LNG_LAT, DEFAULT_MODEL_ROTATION, GeographicAnchor, Placement,
    build_initial_placement,
};
use foundation::math::{Mat4, WebMercator};
use gpu::RecordingRenderer;
use layers::{MapProvider, RecordingMapHost};
use runtime::animation::{AnimationKind, PlacementUpdate};
use scene::SceneGraph;
use serde::Serialize;
use streaming::{Credential, MemoryAssetFetcher, ModelApi, ModelSource, SketchfabApi};
use tracing_subscriber::EnvFilter;
use viewer_web::{Session, ViewerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and simulate geo-anchored 3D models")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the initial placement for an anchor.
    Placement {
        #[command(flatten)]
        anchor: AnchorArgs,
    },

    /// Print the orbiting-drift placement for each tick.
    Drift {
        #[command(flatten)]
        anchor: AnchorArgs,

        #[arg(long, default_value_t = 10)]
        ticks: u32,
    },

    /// Decode a GLB or glTF file and summarize it.
    Inspect { file: String },

    /// Resolve a model id to its GLB download URL.
    Resolve {
        #[arg(long)]
        uid: String,

        /// Falls back to SKETCHFAB_API_TOKEN
        #[arg(long)]
        token: Option<String>,

        /// Falls back to SKETCHFAB_MODEL_PASSWORD
        #[arg(long)]
        password: Option<String>,
    },

    /// Load a file into a headless viewer, animate it and report the result.
    Simulate {
        file: String,

        #[arg(long, default_value_t = 120)]
        ticks: u32,
    },
}

#[derive(clap::Args, Debug)]
struct AnchorArgs {
    #[arg(long, default_value_t = DEFAULT_ANCHOR_LNG_LAT[0], allow_negative_numbers = true)]
    lng: f64,

    #[arg(long, default_value_t = DEFAULT_ANCHOR_LNG_LAT[1], allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, default_value_t = 0.0)]
    alt: f64,
}

impl AnchorArgs {
    fn anchor(&self) -> Result<GeographicAnchor, Box<dyn Error>> {
        Ok(GeographicAnchor::new(self.lng, self.lat, self.alt)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct PlacementReport {
    translate: [f64; 3],
    rotate: [f64; 3],
    scale: f64,
}

impl From<&Placement> for PlacementReport {
    fn from(p: &Placement) -> Self {
        Self {
            translate: [p.translate_x, p.translate_y, p.translate_z],
            rotate: [p.rotate_x, p.rotate_y, p.rotate_z],
            scale: p.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ModelReport {
    nodes: usize,
    meshes: usize,
    roots: usize,
    bounds_min: [f64; 3],
    bounds_max: [f64; 3],
    max_dimension: f64,
    normalization: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SimulationReport {
    state: String,
    layer: Option<String>,
    frames: u64,
    placement: Option<PlacementReport>,
    status: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Placement { anchor } => {
            print_json(&placement_report(&anchor.anchor()?)?)?;
        }
        Command::Drift { anchor, ticks } => {
            print_json(&drift_reports(&anchor.anchor()?, ticks)?)?;
        }
        Command::Inspect { file } => {
            let bytes = tokio::fs::read(&file).await?;
            print_json(&inspect(&bytes)?)?;
        }
        Command::Resolve {
            uid,
            token,
            password,
        } => {
            let config = ViewerConfig::from_env()?;
            let token = token.or(config.sketchfab_api_token.clone());
            let password = password.or(config.sketchfab_model_password.clone());
            let credential = Credential::non_blank(token.as_deref())
                .ok_or("a token is required (--token or SKETCHFAB_API_TOKEN)")?;
            let password = Credential::non_blank(password.as_deref());

            let api = SketchfabApi::with_base_url(&config.sketchfab_api_url);
            let url = api.resolve(&uid, &credential, password.as_ref()).await?;
            println!("{url}");
        }
        Command::Simulate { file, ticks } => {
            let bytes = tokio::fs::read(&file).await?;
            print_json(&simulate(&file, bytes, ticks).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn placement_report(anchor: &GeographicAnchor) -> Result<PlacementReport, Box<dyn Error>> {
    let placement = build_initial_placement(anchor, DEFAULT_MODEL_ROTATION, &WebMercator)?;
    Ok(PlacementReport::from(&placement))
}

fn drift_reports(
    anchor: &GeographicAnchor,
    ticks: u32,
) -> Result<Vec<PlacementReport>, Box<dyn Error>> {
    let mut placement = build_initial_placement(anchor, DEFAULT_MODEL_ROTATION, &WebMercator)?;
    let mut driver = runtime::animation::AnimationDriver::new();
    driver.start(AnimationKind::OrbitingDrift);

    let mut out = Vec::with_capacity(ticks as usize);
    for _ in 0..ticks {
        placement = driver.update(anchor, &placement, &WebMercator);
        out.push(PlacementReport::from(&placement));
    }
    Ok(out)
}

fn inspect(bytes: &[u8]) -> Result<ModelReport, Box<dyn Error>> {
    let mut graph = formats::decode_model(bytes)?;
    Ok(model_report(&mut graph))
}

/// Summarize a decoded graph, applying the same size normalization as a load.
fn model_report(graph: &mut SceneGraph) -> ModelReport {
    let bounds = graph.world_bounds();
    let max_dimension = bounds.max_dimension();
    let normalization = graph.normalize_scale();
    ModelReport {
        nodes: graph.node_count(),
        meshes: graph.mesh_count(),
        roots: graph.roots().len(),
        bounds_min: bounds.min.as_array(),
        bounds_max: bounds.max.as_array(),
        max_dimension,
        normalization,
    }
}

/// Run a headless session: MapLibre host, load `label` from memory, start
/// the drift animation and render `ticks` frames.
async fn simulate(
    label: &str,
    bytes: Vec<u8>,
    ticks: u32,
) -> Result<SimulationReport, Box<dyn Error>> {
    let config = ViewerConfig {
        map_provider: MapProvider::MapLibre,
        ..ViewerConfig::default()
    };
    let mut session = Session::new(RecordingMapHost::new(), RecordingRenderer::new(), config);
    session.initialize_from_config()?;
    session.on_style_loaded();

    let fetcher = MemoryAssetFetcher::new().with_asset(label, bytes);
    let api = SketchfabApi::new();
    session
        .load_model(&api, &fetcher, ModelSource::Url(label.to_string()))
        .await?;
    session.start_animation(AnimationKind::OrbitingDrift)?;

    for _ in 0..ticks {
        session.render_frame(&Mat4::IDENTITY);
    }
    tracing::info!(ticks, state = ?session.state(), "simulation finished");

    let layer = session.layer();
    Ok(SimulationReport {
        state: format!("{:?}", session.state()),
        layer: session.layer_id().map(|id| id.to_string()),
        frames: layer.map(|l| l.frames_rendered()).unwrap_or(0),
        placement: layer.map(|l| PlacementReport::from(l.placement())),
        status: session
            .status()
            .messages()
            .iter()
            .map(|m| m.message.clone())
            .collect(),
    })
}
