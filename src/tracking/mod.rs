//! Tracking: frame-to-frame depth odometry.
//!
//! This module holds the per-run machinery around the alignment primitive:
//! - Double-buffered depth frames (model / observation)
//! - Launch-configuration search before tracking starts
//! - The trajectory accumulator state machine and its per-cycle results

pub mod accumulator;
pub mod frame;
pub mod result;
pub mod state;
pub mod timing;
pub mod tuner;

pub use accumulator::{FailurePolicy, TrajectoryAccumulator};
pub use state::OdometryState;
pub use timing::{Clock, MonotonicClock};
pub use tuner::{LaunchGrid, LaunchTuner};
