//! Frame-to-frame depth ICP odometry.
//!
//! - [`io`]: depth manifest source and trajectory writer
//! - [`icp`]: the alignment primitive and its CPU reference implementation
//! - [`tracking`]: frame buffers, launch tuner and the trajectory accumulator
//! - [`system`]: configuration and top-level wiring

pub mod geometry;
pub mod icp;
pub mod io;
pub mod system;
pub mod tracking;
