//! Odometry state machine.

/// Lifecycle of one tracking run.
///
/// ```text
/// Init ──(tune, 2 frames)──> Warmup ──> Tracking ──(end of stream)──> Terminated
///   └────────(2 frames)────────────────────┘
///   └────────(< 2 frames)────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OdometryState {
    /// Buffers allocated, no frames loaded yet.
    #[default]
    Init,
    /// Searching for the fastest launch configuration on the first two frames.
    Warmup,
    /// Frame-to-frame tracking.
    Tracking,
    /// Stream exhausted.
    Terminated,
}
