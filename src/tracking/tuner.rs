//! Launch-configuration search.
//!
//! Before tracking starts, every `(threads, blocks)` pair on a fixed grid is
//! benchmarked on the first two frames of the stream. Each candidate runs a
//! few repetitions of the exact per-cycle work (re-initialize model and
//! observation, derive the initial guess, refine) and is scored by its mean
//! refine latency. The fastest candidate becomes the launch configuration
//! for the whole run. Nothing else is mutated.

use tracing::{debug, info};

use crate::geometry::SE3;
use crate::icp::{AlignmentPrimitive, LaunchConfig};
use crate::tracking::frame::DepthFrame;
use crate::tracking::timing::{Clock, RunningMean};

/// Repetitions per candidate.
pub const BENCHMARK_REPETITIONS: usize = 5;

/// Inclusive integer range with a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl StepRange {
    pub const fn new(start: u32, end: u32, step: u32) -> Self {
        Self { start, end, step }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.start && value <= self.end && (value - self.start) % self.step.max(1) == 0
    }
}

/// Search space: `threads` is the outer loop, `blocks` the inner one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGrid {
    pub threads: StepRange,
    pub blocks: StepRange,
}

impl LaunchGrid {
    /// 16..=512 step 16 on both axes: 1024 candidates.
    pub const DEFAULT: LaunchGrid = LaunchGrid {
        threads: StepRange::new(16, 512, 16),
        blocks: StepRange::new(16, 512, 16),
    };

    pub fn len(&self) -> usize {
        self.threads.len() * self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, launch: &LaunchConfig) -> bool {
        self.threads.contains(launch.threads) && self.blocks.contains(launch.blocks)
    }

    /// Candidates in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = LaunchConfig> + '_ {
        self.threads
            .iter()
            .flat_map(move |t| self.blocks.iter().map(move |b| LaunchConfig::new(t, b)))
    }
}

impl Default for LaunchGrid {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Snapshot reported after each candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningProgress {
    pub explored: usize,
    pub total: usize,
    pub candidate: LaunchConfig,
    pub candidate_ms: f64,
    pub best: LaunchConfig,
    pub best_ms: f64,
}

impl TuningProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.explored as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningOutcome {
    pub best: LaunchConfig,
    /// Mean refine latency of `best` (ms); infinite if every candidate failed.
    pub latency_ms: f64,
    pub candidates: usize,
    /// Candidates whose refine failed.
    pub disqualified: usize,
}

pub struct LaunchTuner<C> {
    grid: LaunchGrid,
    repetitions: usize,
    fallback: LaunchConfig,
    clock: C,
}

impl<C: Clock> LaunchTuner<C> {
    pub fn new(clock: C) -> Self {
        Self {
            grid: LaunchGrid::DEFAULT,
            repetitions: BENCHMARK_REPETITIONS,
            fallback: LaunchConfig::FALLBACK,
            clock,
        }
    }

    pub fn with_grid(mut self, grid: LaunchGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_fallback(mut self, fallback: LaunchConfig) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn tune<A: AlignmentPrimitive + ?Sized>(
        &self,
        primitive: &mut A,
        model: &DepthFrame,
        observation: &DepthFrame,
    ) -> TuningOutcome {
        self.tune_with_progress(primitive, model, observation, |_| {})
    }

    /// Exhaustive search; `on_progress` is called after every candidate.
    ///
    /// The first candidate with a strictly lower mean replaces the best, so
    /// ties keep the earliest-enumerated configuration.
    pub fn tune_with_progress<A, F>(
        &self,
        primitive: &mut A,
        model: &DepthFrame,
        observation: &DepthFrame,
        mut on_progress: F,
    ) -> TuningOutcome
    where
        A: AlignmentPrimitive + ?Sized,
        F: FnMut(&TuningProgress),
    {
        let total = self.grid.len();
        info!(
            "Searching for the best launch configuration over {} candidates...",
            total
        );

        let mut best = self.fallback;
        let mut best_ms = f64::INFINITY;
        let mut disqualified = 0;

        for (i, candidate) in self.grid.iter().enumerate() {
            let candidate_ms = self.benchmark(primitive, model, observation, candidate);
            if candidate_ms.is_infinite() {
                disqualified += 1;
            }

            if candidate_ms < best_ms {
                best_ms = candidate_ms;
                best = candidate;
                debug!("New best: {} ({:.3}ms)", best, best_ms);
            }

            let progress = TuningProgress {
                explored: i + 1,
                total,
                candidate,
                candidate_ms,
                best,
                best_ms,
            };
            on_progress(&progress);
        }

        info!(
            "Best: {} ({:.3}ms), {} candidates disqualified",
            best, best_ms, disqualified
        );

        TuningOutcome {
            best,
            latency_ms: best_ms,
            candidates: total,
            disqualified,
        }
    }

    /// Mean refine latency (ms) of `launch` on the fixed frame pair.
    ///
    /// Infinite if any repetition fails to refine.
    pub fn benchmark<A: AlignmentPrimitive + ?Sized>(
        &self,
        primitive: &mut A,
        model: &DepthFrame,
        observation: &DepthFrame,
        launch: LaunchConfig,
    ) -> f64 {
        let mut latency = RunningMean::new();

        for _ in 0..self.repetitions {
            primitive.init_model(model);
            primitive.init_observation(observation);

            let tick = self.clock.now_ms();

            // Same initial guess the tracking loop derives on its first cycle
            let previous_pose = SE3::identity();
            let current_pose = SE3::identity();
            let mut transform = previous_pose.inverse().compose(&current_pose);

            if let Err(e) = primitive.refine(&mut transform, launch) {
                debug!("Candidate {} disqualified: {}", launch, e);
                return f64::INFINITY;
            }

            let tock = self.clock.now_ms();
            latency.push(tock - tick);
        }

        latency.mean()
    }
}
