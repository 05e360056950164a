//! Dataset input and trajectory output.

pub mod depth;
pub mod manifest;
pub mod source;
pub mod trajectory;

pub use depth::{DepthLoader, PngDepthLoader};
pub use source::{FrameSource, ManifestFrameSource};
pub use trajectory::{FreiburgWriter, MemorySink, TrajectorySink};
