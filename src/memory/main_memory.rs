use crate::shared::definitions::{FrameIndex, PAGE_SIZE};
use std::ops::Range;

/// Simulated physical memory: one contiguous buffer carved into
/// page-sized frames.
#[derive(Debug)]
pub struct MainMemory {
    buffer: Vec<u8>,
}

impl MainMemory {
    pub const DEFAULT_BYTE: u8 = 0x00u8;

    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0);
        Self {
            buffer: vec![Self::DEFAULT_BYTE; num_frames * PAGE_SIZE],
        }
    }

    #[inline]
    fn frame_range(&self, frame: FrameIndex) -> Range<usize> {
        (PAGE_SIZE * frame.0)..(PAGE_SIZE * (frame.0 + 1))
    }

    pub fn frame(&self, frame: FrameIndex) -> &[u8] {
        &self.buffer[self.frame_range(frame)]
    }

    pub fn frame_mut(&mut self, frame: FrameIndex) -> &mut [u8] {
        let range = self.frame_range(frame);
        &mut self.buffer[range]
    }

    /// Copies `data` into `frame` at `offset`; must stay within the frame.
    pub fn write(&mut self, frame: FrameIndex, offset: usize, data: &[u8]) {
        assert!(offset + data.len() <= PAGE_SIZE);
        let start = PAGE_SIZE * frame.0 + offset;
        self.buffer[start..start + data.len()].copy_from_slice(data);
    }
}
