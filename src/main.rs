//! `icp-odometry`: frame-to-frame depth ICP over a recorded dataset.
//!
//! ```bash
//! icp-odometry data/rgbd_dataset_freiburg1_xyz --config tum.yaml
//! icp-odometry data/capture -v --output traj.txt
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_icp_odometry::system::{OdometryConfig, OdometrySystem, DEFAULT_TRAJECTORY_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "icp-odometry",
    version,
    about = "Depth ICP odometry with launch-configuration tuning"
)]
struct Args {
    /// Dataset directory containing `depth.txt` and the depth images it lists.
    #[arg(value_name = "DATASET_DIR")]
    dataset_dir: PathBuf,

    /// Search for the fastest launch configuration before tracking.
    #[arg(short = 'v', long)]
    tune: bool,

    /// YAML configuration file; deployment defaults are used if omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trajectory output file.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_TRAJECTORY_FILE)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            OdometryConfig::from_yaml_file(path)?
        }
        None => OdometryConfig::default(),
    };

    let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
    info!("Device: CPU reference ICP, {} hardware threads", workers);

    info!("Dataset: {}", args.dataset_dir.display());
    let system = OdometrySystem::new(config, args.tune)?;
    let summary = system.run(&args.dataset_dir, &args.output)?;

    info!(
        "Done: {} poses, mean ICP {:.4}ms with {}",
        summary.cycles, summary.mean_latency_ms, summary.launch
    );
    Ok(())
}
