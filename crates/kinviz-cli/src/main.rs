//! kinviz headless entry point
//!
//! Loads a URDF into a scene, applies a joint state, optionally checks
//! contacts and samples the workspace, then writes the scene snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use kinviz_core::{JointValues, PoseLibrary, UrdfEnvironment};
use kinviz_scene::{SceneConfig, SceneContext, normalized_distance_scalars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorBy {
    /// Yoshikawa manipulability at each sample
    Manipulability,
    /// Distance from the cloud centroid
    Distance,
}

#[derive(Debug, Parser)]
#[command(name = "kinviz", version, about = "Build a robot scene and export its snapshot")]
struct Args {
    /// URDF model to load
    model: PathBuf,

    /// Scene configuration (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Joint state as a JSON object of joint name to value
    #[arg(long)]
    state: Option<PathBuf>,

    /// Pose library (JSON) to read `--pose` from
    #[arg(long, requires = "pose")]
    poses: Option<PathBuf>,

    /// Named pose applied after `--state`
    #[arg(long, requires = "poses")]
    pose: Option<String>,

    /// Run the contact test at the final pose
    #[arg(long)]
    contacts: bool,

    /// Contact margin in meters
    #[arg(long, default_value_t = 0.0)]
    margin: f64,

    /// Number of workspace samples
    #[arg(long, requires = "tcp")]
    workspace: Option<usize>,

    /// Link whose origin is sampled
    #[arg(long)]
    tcp: Option<String>,

    /// Trace the kinematic chain from this link to `--tcp`
    #[arg(long, requires = "tcp")]
    fk_chain: Option<String>,

    #[arg(long, value_enum, default_value_t = ColorBy::Manipulability)]
    color_by: ColorBy,

    /// RNG seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the snapshot; stdout when omitted
    #[arg(long, short)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinviz=info,kinviz_core=info,kinviz_scene=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if args.seed.is_some() {
        config.sampling_seed = args.seed;
    }

    let mut env = UrdfEnvironment::from_urdf_file(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;
    if args.contacts {
        env = env.with_contact_checking(args.margin);
    }

    let mut scene = SceneContext::new(config);
    scene.load(Arc::new(env))?;
    let fallbacks: usize = scene.registry().nodes().map(|n| n.warnings.len()).sum();
    tracing::info!(
        links = scene.registry().len(),
        fallbacks,
        "Scene ready"
    );

    if let Some(path) = &args.state {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading joint state {}", path.display()))?;
        let values: JointValues = serde_json::from_str(&text)
            .with_context(|| format!("parsing joint state {}", path.display()))?;
        scene.apply(&values)?;
    }

    if let (Some(path), Some(name)) = (&args.poses, &args.pose) {
        let library = PoseLibrary::load_from_file(path)?;
        let Some(values) = library.load(name) else {
            bail!("pose {name:?} not found in {}", path.display());
        };
        scene.apply(values)?;
    }

    if let Some(tcp) = &args.tcp {
        scene.set_tcp_link(Some(tcp.as_str()))?;
        let pose = scene.tcp_pose(&JointValues::new(), tcp)?;
        scene.place_tcp_marker(&pose)?;
        tracing::info!(link = %tcp, position = ?pose.translation, "TCP");
        if let Some(base) = &args.fk_chain {
            scene.trace_fk_chain(base, tcp)?;
        }
    }

    if args.contacts {
        let contacts = scene.check_contacts()?;
        for contact in &contacts {
            tracing::info!(
                a = %contact.link_names[0],
                b = %contact.link_names[1],
                distance = contact.distance,
                "Contact"
            );
        }
    }

    if let (Some(n_samples), Some(tcp)) = (args.workspace, &args.tcp) {
        let request = scene.workspace_request(tcp, n_samples)?;
        let job = scene.spawn_workspace_sampling(request)?;
        let result = job.join()?;
        tracing::info!(
            points = result.points().len(),
            skipped = result.samples.skipped,
            singular = result.manipulability.unavailable(),
            "Workspace sampled"
        );
        match args.color_by {
            ColorBy::Manipulability => scene.show_workspace_result(result)?,
            ColorBy::Distance => {
                let points = result.samples.points;
                let scalars = normalized_distance_scalars(&points, None);
                let size = scene.config().workspace_point_size;
                scene.show_workspace(points, scalars, size)?;
            }
        }
    }

    let json = scene.snapshot().to_json()?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing snapshot {}", path.display()))?;
            tracing::info!(path = %path.display(), "Snapshot written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
