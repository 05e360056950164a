use std::fmt;

use serde::Deserialize;

use super::AlignError;

/// Parallel layout of the alignment reduction.
///
/// `threads` is the parallelism width inside one unit (lanes per block),
/// `blocks` the number of units the correspondence set is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct LaunchConfig {
    pub threads: u32,
    pub blocks: u32,
}

impl LaunchConfig {
    /// Configuration used when the launch search is skipped.
    pub const FALLBACK: LaunchConfig = LaunchConfig {
        threads: 224,
        blocks: 96,
    };

    pub const fn new(threads: u32, blocks: u32) -> Self {
        Self { threads, blocks }
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        if self.threads == 0 || self.blocks == 0 {
            return Err(AlignError::InvalidLaunch(*self));
        }
        Ok(())
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} threads, {} blocks", self.threads, self.blocks)
    }
}
