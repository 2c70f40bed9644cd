use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use scene_lift::config::PipelineConfig;
use scene_lift::io::{read_scene_table, write_objects_csv};
use scene_lift::pipeline;
use scene_lift::scene::{merge_scenes, MatchStrategy, MergeOptions};

#[derive(Parser)]
#[command(name = "scene-lift")]
#[command(about = "Lift tracked 2D detections from swept cameras into one merged 3D scene")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from a YAML configuration.
    Run {
        /// Path to the pipeline configuration file.
        config: PathBuf,
    },

    /// Merge two previously written scene table pairs.
    Merge(MergeArgs),
}

#[derive(Debug, Clone, Args)]
struct MergeArgs {
    /// Objects table of the authoritative view.
    #[arg(long)]
    primary_objects: PathBuf,

    /// Vertex table of the authoritative view.
    #[arg(long)]
    primary_vertices: PathBuf,

    /// Objects table of the secondary view.
    #[arg(long)]
    secondary_objects: PathBuf,

    /// Vertex table of the secondary view (validated only; not in the merged output).
    #[arg(long)]
    secondary_vertices: PathBuf,

    /// Maximum 3D distance between fusable counterparts.
    #[arg(long, default_value = "3.0")]
    distance_threshold: f64,

    /// Counterpart matching strategy.
    #[arg(long, value_enum, default_value_t = MatchStrategy::IdProximity)]
    strategy: MatchStrategy,

    /// Directory for merged_objects.csv and merged_vertices.csv.
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => run_pipeline(&config),
        Commands::Merge(args) => run_merge(&args),
    }
}

fn run_pipeline(config_path: &Path) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    info!(
        "Running {} view(s) from {}",
        config.views.len(),
        config_path.display()
    );
    pipeline::run(&config)
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let primary = read_scene_table(&args.primary_objects, &args.primary_vertices)?;
    let secondary = read_scene_table(&args.secondary_objects, &args.secondary_vertices)?;
    let options = MergeOptions {
        distance_threshold: args.distance_threshold,
        strategy: args.strategy,
    };

    let merged = merge_scenes(&primary, &secondary, &options);

    std::fs::create_dir_all(&args.out_dir).with_context(|| {
        format!("Failed to create output directory {}", args.out_dir.display())
    })?;
    write_objects_csv(&args.out_dir.join("merged_objects.csv"), &merged.objects)?;
    write_objects_csv(&args.out_dir.join("merged_vertices.csv"), &merged.vertices)?;
    info!(
        "Merged scene: {} objects, {} vertices written to {}",
        merged.objects.len(),
        merged.vertices.len(),
        args.out_dir.display()
    );
    Ok(())
}
