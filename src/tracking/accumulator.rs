//! Trajectory accumulator: the frame-to-frame tracking loop.
//!
//! Owns the two depth buffers, the running camera pose and the latency
//! statistics. Each cycle aligns the observation against the model, composes
//! the refined increment onto the trajectory, swaps buffer roles and emits one
//! pose record. The next frame is then loaded into the retired model buffer.
//!
//! Timestamps: the record emitted by a cycle carries the timestamp of the
//! observation frame that was aligned in that cycle, captured before the
//! buffers are swapped.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::geometry::SE3;
use crate::icp::{AlignmentPrimitive, LaunchConfig};
use crate::io::source::FrameSource;
use crate::io::trajectory::TrajectorySink;
use crate::tracking::frame::FrameBuffers;
use crate::tracking::result::{CycleResult, RunSummary, TrajectoryRecord};
use crate::tracking::state::OdometryState;
use crate::tracking::timing::{Clock, RunningMean};
use crate::tracking::tuner::{LaunchGrid, LaunchTuner, TuningOutcome};

/// Log a progress line every this many cycles.
const LOG_EVERY_CYCLES: u64 = 100;

/// What to do when the alignment primitive cannot refine a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the previous pose (identity increment) and flag the record as degraded.
    #[default]
    HoldPose,
    /// Stop the run with an error.
    Abort,
}

pub struct TrajectoryAccumulator<A, C> {
    primitive: A,
    clock: C,
    buffers: FrameBuffers,

    /// T_wc of the previous and current frame.
    previous_pose: SE3,
    current_pose: SE3,

    launch: LaunchConfig,
    tuning: Option<LaunchGrid>,
    policy: FailurePolicy,

    latency: RunningMean,
    state: OdometryState,
    cycles: u64,
    degraded_cycles: u64,
}

impl<A: AlignmentPrimitive, C: Clock> TrajectoryAccumulator<A, C> {
    /// Allocate both frame buffers at `width` x `height`.
    pub fn new(primitive: A, clock: C, width: usize, height: usize) -> Self {
        Self {
            primitive,
            clock,
            buffers: FrameBuffers::new(width, height),
            previous_pose: SE3::identity(),
            current_pose: SE3::identity(),
            launch: LaunchConfig::FALLBACK,
            tuning: None,
            policy: FailurePolicy::default(),
            latency: RunningMean::new(),
            state: OdometryState::Init,
            cycles: 0,
            degraded_cycles: 0,
        }
    }

    /// Launch configuration used when tuning is off (or finds nothing better).
    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    /// Search `grid` for the fastest launch configuration before tracking.
    pub fn with_tuning(mut self, grid: LaunchGrid) -> Self {
        self.tuning = Some(grid);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> OdometryState {
        self.state
    }

    pub fn current_pose(&self) -> &SE3 {
        &self.current_pose
    }

    pub fn previous_pose(&self) -> &SE3 {
        &self.previous_pose
    }

    pub fn launch(&self) -> LaunchConfig {
        self.launch
    }

    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    pub fn primitive(&self) -> &A {
        &self.primitive
    }

    pub fn mean_latency_ms(&self) -> f64 {
        self.latency.mean()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn degraded_cycles(&self) -> u64 {
        self.degraded_cycles
    }

    /// Load the first model and observation frames.
    ///
    /// Returns false (and terminates) if the stream holds fewer than two frames.
    pub fn prime<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<bool> {
        if self.state != OdometryState::Init {
            return Err(anyhow!("prime called in state {:?}", self.state));
        }

        let primed = source.produce_next(self.buffers.model_mut())?.is_some()
            && source.produce_next(self.buffers.observation_mut())?.is_some();

        if !primed {
            self.state = OdometryState::Terminated;
        }
        Ok(primed)
    }

    /// Run the launch search on the primed frame pair and adopt its winner.
    pub fn warm_up(&mut self, grid: LaunchGrid) -> TuningOutcome {
        self.state = OdometryState::Warmup;

        let tuner = LaunchTuner::new(&self.clock)
            .with_grid(grid)
            .with_fallback(self.launch);
        let mut next_report = 10.0;
        let outcome = tuner.tune_with_progress(
            &mut self.primitive,
            self.buffers.model(),
            self.buffers.observation(),
            |p| {
                if p.percent() >= next_report {
                    info!(
                        "Best: {} ({:.3}ms), {:.0}%",
                        p.best,
                        p.best_ms,
                        p.percent()
                    );
                    next_report += 10.0;
                }
            },
        );

        self.launch = outcome.best;
        outcome
    }

    /// One tracking cycle on the current model/observation pair.
    ///
    /// Swaps buffer roles on the way out; the caller loads the next frame
    /// into the new observation buffer.
    pub fn cycle(&mut self) -> Result<CycleResult> {
        self.state = OdometryState::Tracking;

        self.primitive.init_model(self.buffers.model());
        self.primitive.init_observation(self.buffers.observation());

        let tick = self.clock.now_ms();

        self.previous_pose = self.current_pose;
        let mut transform = self.previous_pose.inverse().compose(&self.current_pose);

        let (convergence, degraded) = match self.primitive.refine(&mut transform, self.launch) {
            Ok(convergence) => (Some(convergence), false),
            Err(e) => match self.policy {
                FailurePolicy::Abort => {
                    self.state = OdometryState::Terminated;
                    return Err(anyhow!(e).context(format!(
                        "Alignment failed at frame {}",
                        self.buffers.observation().timestamp
                    )));
                }
                FailurePolicy::HoldPose => {
                    warn!(
                        "Alignment failed at frame {} ({}); holding pose",
                        self.buffers.observation().timestamp,
                        e
                    );
                    transform = SE3::identity();
                    (None, true)
                }
            },
        };

        self.current_pose = self.previous_pose.compose(&transform);

        let tock = self.clock.now_ms();
        let latency_ms = tock - tick;
        self.latency.push(latency_ms);

        let timestamp = self.buffers.observation().timestamp;
        self.buffers.swap();

        self.cycles += 1;
        if degraded {
            self.degraded_cycles += 1;
        }

        Ok(CycleResult {
            record: TrajectoryRecord {
                timestamp,
                pose: self.current_pose,
                degraded,
            },
            increment: transform,
            convergence,
            latency_ms,
        })
    }

    /// Track the whole stream, writing one record per cycle to `sink`.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: TrajectorySink + ?Sized,
    {
        if !self.prime(source)? {
            info!("Fewer than two frames in the stream; nothing to track");
            return Ok(self.summary());
        }

        if let Some(grid) = self.tuning {
            self.warm_up(grid);
        }
        self.state = OdometryState::Tracking;
        info!("Tracking with {}", self.launch);

        loop {
            let result = self.cycle()?;
            sink.append(&result.record)?;

            debug!(
                "ICP: {:.4}ms (mean {:.4}ms), t = [{:.3}, {:.3}, {:.3}]",
                result.latency_ms,
                self.latency.mean(),
                self.current_pose.translation.x,
                self.current_pose.translation.y,
                self.current_pose.translation.z,
            );
            if self.cycles % LOG_EVERY_CYCLES == 0 {
                info!(
                    "Frame {}: ICP {:.4}ms, {} degraded",
                    self.cycles,
                    self.latency.mean(),
                    self.degraded_cycles
                );
            }

            if source.produce_next(self.buffers.observation_mut())?.is_none() {
                break;
            }
        }

        self.state = OdometryState::Terminated;
        let summary = self.summary();
        info!(
            "ICP speed: {}Hz over {} cycles ({} degraded)",
            summary.rate_hz() as u64,
            summary.cycles,
            summary.degraded_cycles
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            cycles: self.cycles,
            degraded_cycles: self.degraded_cycles,
            mean_latency_ms: self.latency.mean(),
            launch: self.launch,
            final_pose: self.current_pose,
        }
    }
}
