//! Frame-level types: camera model, depth frames, double buffering.

pub mod buffers;
pub mod camera;
pub mod depth;

pub use buffers::FrameBuffers;
pub use camera::CameraModel;
pub use depth::DepthFrame;
