//! Geometry utilities: SE3 transforms and SO(3) helpers.

pub mod se3;
pub mod so3;

pub use se3::SE3;
pub use so3::{exp_so3, skew};
