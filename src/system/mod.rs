//! Run configuration and top-level wiring.
//!
//! [`OdometrySystem`] builds the frame source, the CPU ICP, the trajectory
//! accumulator and the trajectory writer from an [`OdometryConfig`], then
//! drives one run over a dataset directory.

pub mod config;
mod odometry;

pub use config::OdometryConfig;
pub use odometry::{OdometrySystem, DEFAULT_TRAJECTORY_FILE};
