//! mphys CLI - headless runner for physics scene documents
//!
//! Runs rigid bodies and pendulums forward in time, samples the electric
//! and magnetic fields a document describes and traces its light rays.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mphys_field::{
    sample_grid, trace, ElectricField, FieldSample, Lens, MagneticField, Ray, TracedRay,
};
use mphys_ir::SceneDocument;
use mphys_rigid::{Frame, SpaceScene};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mphys")]
#[command(about = "Headless runner for mphys physics scenes", long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene document and record body poses as JSON
    Simulate {
        /// Path to the scene document
        file: PathBuf,
        /// Simulated seconds to run
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,
        /// Frame rate (default: the document's, or 60)
        #[arg(long)]
        fps: Option<f64>,
        /// Record every Nth frame
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
        /// Write frames to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sample a field of the document on a square grid around the origin
    Field {
        /// Path to the scene document
        file: PathBuf,
        /// Which field to sample
        #[arg(short, long, value_enum)]
        kind: FieldKind,
        /// Half-width of the sampled square
        #[arg(short, long, default_value_t = 4.0)]
        range: f64,
        /// Grid spacing
        #[arg(long, default_value_t = 0.5)]
        step: f64,
    },
    /// Trace the document's rays through its lenses
    Trace {
        /// Path to the scene document
        file: PathBuf,
    },
    /// Display information about a scene document
    Info {
        /// Path to the scene document
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FieldKind {
    /// Field of the point charges
    Electric,
    /// Field of the currents, magnets and wires
    Magnetic,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate {
            file,
            seconds,
            fps,
            every,
            output,
        } => {
            let doc = load(&file)?;
            let frames = simulate(&doc, seconds, fps, every)?;
            let json = serde_json::to_string_pretty(&frames)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {} frame(s) to {}", frames.len(), path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Field {
            file,
            kind,
            range,
            step,
        } => {
            let doc = load(&file)?;
            let samples = sample_field(&doc, kind, range, step)?;
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
        Commands::Trace { file } => {
            let doc = load(&file)?;
            let rays = trace_rays(&doc)?;
            println!("{}", serde_json::to_string_pretty(&rays)?);
        }
        Commands::Info { file } => {
            let doc = load(&file)?;
            show_info(&file, &doc);
        }
    }

    Ok(())
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<SceneDocument> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = SceneDocument::from_json(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), mobjects = doc.mobjects.len(), "loaded document");
    Ok(doc)
}

/// Run `doc` for `seconds`, keeping the initial frame and every `every`th
/// frame after it.
fn simulate(doc: &SceneDocument, seconds: f64, fps: Option<f64>, every: u64) -> Result<Vec<Frame>> {
    if !seconds.is_finite() || seconds < 0.0 {
        anyhow::bail!("seconds must be a non-negative number, got {seconds}");
    }
    if every == 0 {
        anyhow::bail!("--every must be at least 1");
    }

    let mut doc = doc.clone();
    if let Some(fps) = fps {
        doc.space.fps = Some(fps);
    }
    let mut scene = SpaceScene::from_document(&doc)?;
    let fps = scene.space().config().fps;
    let total = (seconds * fps).round() as u64;
    info!(fps, frames = total, "simulating");

    let mut frames = vec![scene.snapshot()];
    for n in 1..=total {
        scene.advance_frame(1.0 / fps)?;
        if n % every == 0 {
            frames.push(scene.snapshot());
        }
    }
    Ok(frames)
}

fn sample_field(
    doc: &SceneDocument,
    kind: FieldKind,
    range: f64,
    step: f64,
) -> Result<Vec<FieldSample>> {
    if !range.is_finite() || range <= 0.0 {
        anyhow::bail!("range must be positive, got {range}");
    }
    let extent = (-range, range);
    let samples = match kind {
        FieldKind::Electric => {
            if doc.charges.is_empty() {
                anyhow::bail!("Document has no charges");
            }
            sample_grid(&ElectricField::from_defs(&doc.charges), extent, extent, step)?
        }
        FieldKind::Magnetic => {
            if doc.magnetic_sources.is_empty() {
                anyhow::bail!("Document has no magnetic sources");
            }
            let field = MagneticField::from_defs(&doc.magnetic_sources)?;
            sample_grid(&field, extent, extent, step)?
        }
    };
    Ok(samples)
}

fn trace_rays(doc: &SceneDocument) -> Result<Vec<TracedRay>> {
    if doc.rays.is_empty() {
        anyhow::bail!("Document has no rays");
    }
    let lenses = doc
        .lenses
        .iter()
        .enumerate()
        .map(|(i, def)| Lens::from_def(def).with_context(|| format!("lens {i}")))
        .collect::<Result<Vec<_>>>()?;
    let mut rays = doc
        .rays
        .iter()
        .enumerate()
        .map(|(i, def)| Ray::from_def(def).with_context(|| format!("ray {i}")))
        .collect::<Result<Vec<_>>>()?;
    trace(&lenses, &mut rays);
    Ok(rays.iter().map(Ray::traced).collect())
}

fn show_info(file: &Path, doc: &SceneDocument) {
    println!("mphys document: {}", file.display());
    println!("  Version: {}", doc.version);
    println!("  Mobjects: {}", doc.mobjects.len());
    println!("  Rigid bodies: {}", doc.rigid_bodies.len());
    println!("  Static bodies: {}", doc.static_bodies.len());
    println!("  Pendulums: {}", doc.pendulums.len());
    println!("  Charges: {}", doc.charges.len());
    println!("  Magnetic sources: {}", doc.magnetic_sources.len());
    println!("  Lenses: {}", doc.lenses.len());
    println!("  Rays: {}", doc.rays.len());

    match SpaceScene::from_document(doc) {
        Ok(scene) => {
            let space = scene.space();
            println!("\nSimulation:");
            println!("  Bodies: {}", space.body_count());
            println!("  Colliders: {}", space.collider_count());
            println!("  Joints: {}", space.joint_count());
            println!("  Frame rate: {}", space.config().fps);
        }
        Err(e) => {
            println!("\nFailed to build simulation: {}", e);
        }
    }
}
