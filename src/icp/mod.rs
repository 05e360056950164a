//! Rigid alignment between two depth frames.
//!
//! The tracking loop only sees the [`AlignmentPrimitive`] capability:
//! - `init_model` / `init_observation` rebuild the reference and target
//!   surfaces from the current buffer contents, every cycle
//! - `refine` improves the incremental transform T_prev_curr in place
//!
//! [`CpuIcp`] is the reference implementation (projective point-to-plane ICP).

pub mod cpu;
pub mod launch;
mod reduction;
mod surface;

use thiserror::Error;

use crate::geometry::SE3;
use crate::tracking::frame::DepthFrame;

pub use cpu::{CpuIcp, IcpParams};
pub use launch::LaunchConfig;

/// Why a refinement could not produce a trustworthy transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("model and observation must be initialized before refine")]
    NotInitialized,
    #[error("invalid launch configuration ({0})")]
    InvalidLaunch(LaunchConfig),
    #[error("frame is {found_w}x{found_h}, camera expects {expected_w}x{expected_h}")]
    FrameSize {
        found_w: usize,
        found_h: usize,
        expected_w: usize,
        expected_h: usize,
    },
    #[error("only {found} correspondences, need at least {required}")]
    InsufficientCorrespondences { found: usize, required: usize },
    #[error("normal equations are singular")]
    Degenerate,
}

/// Diagnostics from a successful refinement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Convergence {
    pub iterations: usize,
    /// Correspondences used in the last iteration.
    pub correspondences: usize,
    /// Point-to-plane RMS residual of the last iteration (metres).
    pub rmse: f64,
}

/// Frame-to-frame rigid registration.
pub trait AlignmentPrimitive {
    /// Build the reference surface from the previous frame.
    fn init_model(&mut self, frame: &DepthFrame);

    /// Build the target surface from the current frame.
    fn init_observation(&mut self, frame: &DepthFrame);

    /// Refine `transform` (T_prev_curr) in place.
    ///
    /// On error the transform is left untouched.
    fn refine(&mut self, transform: &mut SE3, launch: LaunchConfig)
        -> Result<Convergence, AlignError>;
}

impl<A: AlignmentPrimitive + ?Sized> AlignmentPrimitive for Box<A> {
    fn init_model(&mut self, frame: &DepthFrame) {
        (**self).init_model(frame)
    }

    fn init_observation(&mut self, frame: &DepthFrame) {
        (**self).init_observation(frame)
    }

    fn refine(
        &mut self,
        transform: &mut SE3,
        launch: LaunchConfig,
    ) -> Result<Convergence, AlignError> {
        (**self).refine(transform, launch)
    }
}
