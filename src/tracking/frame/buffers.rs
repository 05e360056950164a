//! Double-buffered depth storage with index-based role swapping.
//!
//! Two slots are allocated up front. A single index says which slot is the
//! model (previous frame); the other is the observation (current frame).
//! Swapping flips the index, never the data, so the next frame can be
//! loaded straight into the slot whose model role was just retired.

use super::depth::DepthFrame;

pub struct FrameBuffers {
    slots: [DepthFrame; 2],
    model_slot: usize,
    swaps: u64,
}

impl FrameBuffers {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            slots: [DepthFrame::new(width, height), DepthFrame::new(width, height)],
            model_slot: 0,
            swaps: 0,
        }
    }

    pub fn model(&self) -> &DepthFrame {
        &self.slots[self.model_slot]
    }

    pub fn observation(&self) -> &DepthFrame {
        &self.slots[self.observation_slot()]
    }

    pub fn model_mut(&mut self) -> &mut DepthFrame {
        &mut self.slots[self.model_slot]
    }

    pub fn observation_mut(&mut self) -> &mut DepthFrame {
        let idx = self.observation_slot();
        &mut self.slots[idx]
    }

    /// Physical slot currently acting as the model.
    pub fn model_slot(&self) -> usize {
        self.model_slot
    }

    /// Physical slot currently acting as the observation.
    pub fn observation_slot(&self) -> usize {
        1 - self.model_slot
    }

    /// Reassign roles: the observation becomes the model and vice versa.
    pub fn swap(&mut self) {
        self.model_slot = 1 - self.model_slot;
        self.swaps += 1;
    }

    pub fn swap_count(&self) -> u64 {
        self.swaps
    }
}
