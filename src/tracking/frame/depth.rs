/// A single depth image with its capture timestamp.
///
/// Samples are raw sensor units (millimetres after the depth factor has
/// been applied), row-major, zero meaning "no measurement".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub timestamp: u64,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl DepthFrame {
    /// Allocate a zeroed frame. Buffers are allocated once and refilled in place.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            timestamp: 0,
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn row(&self, v: usize) -> &[u16] {
        &self.data[v * self.width..(v + 1) * self.width]
    }
}
