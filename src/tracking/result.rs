//! Per-cycle and per-run results.

use crate::geometry::SE3;
use crate::icp::{Convergence, LaunchConfig};

/// One accumulated pose, tagged with the timestamp of the frame it was estimated for.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRecord {
    pub timestamp: u64,
    /// T_wc after this cycle.
    pub pose: SE3,
    /// Alignment failed and the pose was held.
    pub degraded: bool,
}

/// Everything that happened in one tracking cycle.
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub record: TrajectoryRecord,
    /// Refined T_prev_curr (identity when degraded).
    pub increment: SE3,
    /// None when alignment failed.
    pub convergence: Option<Convergence>,
    pub latency_ms: f64,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records emitted to the sink.
    pub cycles: u64,
    pub degraded_cycles: u64,
    pub mean_latency_ms: f64,
    pub launch: LaunchConfig,
    pub final_pose: SE3,
}

impl RunSummary {
    /// Tracking rate implied by the mean cycle latency.
    pub fn rate_hz(&self) -> f64 {
        if self.mean_latency_ms > 0.0 {
            1000.0 / self.mean_latency_ms
        } else {
            0.0
        }
    }
}
