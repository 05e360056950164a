//! YAML run configuration.
//!
//! Every field is optional; missing ones take the deployment defaults
//! (1280x720 depth sensor, depth stored in millimetres).
//!
//! ```yaml
//! camera:
//!   width: 640
//!   height: 480
//!   fx: 525.0
//!   fy: 525.0
//!   cx: 319.5
//!   cy: 239.5
//! depth_factor: 5
//! icp:
//!   dist_threshold: 0.1
//!   iterations: [10, 5, 4]
//! failure_policy: abort
//! fallback_launch: { threads: 224, blocks: 96 }
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::icp::{IcpParams, LaunchConfig};
use crate::tracking::frame::CameraModel;
use crate::tracking::FailurePolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OdometryConfig {
    pub camera: CameraModel,
    /// Raw depth samples are divided by this to get millimetres.
    pub depth_factor: u16,
    pub icp: IcpParams,
    pub failure_policy: FailurePolicy,
    /// Launch configuration used when tuning is off.
    pub fallback_launch: LaunchConfig,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            camera: CameraModel::default(),
            depth_factor: 1,
            icp: IcpParams::default(),
            failure_policy: FailurePolicy::default(),
            fallback_launch: LaunchConfig::FALLBACK,
        }
    }
}

impl OdometryConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.camera;
        ensure!(
            c.width > 0 && c.height > 0,
            "camera size must be positive, got {}x{}",
            c.width,
            c.height
        );
        ensure!(
            c.fx > 0.0 && c.fy > 0.0,
            "focal lengths must be positive, got fx={} fy={}",
            c.fx,
            c.fy
        );
        ensure!(self.depth_factor > 0, "depth_factor must be at least 1");
        ensure!(
            self.icp.dist_threshold > 0.0 && self.icp.angle_threshold_deg > 0.0,
            "ICP thresholds must be positive"
        );
        self.fallback_launch
            .validate()
            .context("Invalid fallback_launch")?;
        Ok(())
    }
}
