//! Odometry System - wires one tracking run together.
//!
//! The `OdometrySystem` owns the run configuration. `run` opens the dataset
//! manifest, truncates the trajectory file and drives the trajectory
//! accumulator with the CPU ICP until the stream is exhausted.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::icp::CpuIcp;
use crate::io::{FreiburgWriter, ManifestFrameSource, PngDepthLoader};
use crate::tracking::result::RunSummary;
use crate::tracking::{LaunchGrid, MonotonicClock, TrajectoryAccumulator};

use super::config::OdometryConfig;

/// Trajectory file written when no output path is given.
pub const DEFAULT_TRAJECTORY_FILE: &str = "icp_odometry_traj.txt";

pub struct OdometrySystem {
    config: OdometryConfig,
    /// Search the launch grid on the first two frames before tracking.
    tune: bool,
}

impl OdometrySystem {
    pub fn new(config: OdometryConfig, tune: bool) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tune })
    }

    /// Track every frame listed in `<dataset_dir>/depth.txt`, writing poses to `output`.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        dataset_dir: P,
        output: Q,
    ) -> Result<RunSummary> {
        let camera = self.config.camera;

        let loader = PngDepthLoader::new(self.config.depth_factor);
        let mut source = ManifestFrameSource::open(dataset_dir.as_ref(), loader)?;
        let mut sink = FreiburgWriter::create(output.as_ref())?;

        info!(
            "Camera {}x{} (fx={:.3}, fy={:.3}, cx={:.3}, cy={:.3}), depth factor {}",
            camera.width,
            camera.height,
            camera.fx,
            camera.fy,
            camera.cx,
            camera.cy,
            self.config.depth_factor
        );

        let icp = CpuIcp::new(camera, self.config.icp.clone());
        let mut accumulator =
            TrajectoryAccumulator::new(icp, MonotonicClock::new(), camera.width, camera.height)
                .with_launch(self.config.fallback_launch)
                .with_failure_policy(self.config.failure_policy);
        if self.tune {
            accumulator = accumulator.with_tuning(LaunchGrid::DEFAULT);
        }

        let summary = accumulator.run(&mut source, &mut sink)?;

        info!(
            "Wrote {} poses to {:?} ({} manifest lines skipped)",
            sink.lines_written(),
            sink.path(),
            source.skipped()
        );
        Ok(summary)
    }
}
