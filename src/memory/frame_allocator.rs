use crate::shared::definitions::{Bitmap, FrameIndex};

/// Global physical-frame pool, shared by every address space. Constructed
/// once at kernel boot and mutated only while resolving a fault or tearing
/// an address space down.
#[derive(Debug)]
pub struct FrameAllocator {
    map: Bitmap,
}

impl FrameAllocator {
    pub fn new(num_frames: usize) -> Self {
        Self {
            map: Bitmap::new(num_frames),
        }
    }

    /// Marks and returns the lowest-indexed free frame.
    pub fn find(&mut self) -> Option<FrameIndex> {
        self.map.find().map(FrameIndex)
    }

    /// Requires `frame` to be currently allocated.
    pub fn release(&mut self, frame: FrameIndex) {
        self.map.clear(frame.0);
    }

    pub fn num_clear(&self) -> usize {
        self.map.num_clear()
    }
}
