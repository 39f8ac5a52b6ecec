use std::fmt;

/// Bytes per virtual page, physical frame, and swap slot. All three units
/// share one size; the fault path copies whole pages only.
pub const PAGE_SIZE: usize = 128;

/// Extra virtual space appended after the image segments for the user stack,
/// rounded up to whole pages with the rest of the address space.
pub const USER_STACK_SIZE: usize = 1024;

/// Default resident-set quota per address space.
pub const DEFAULT_RESIDENT_QUOTA: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AsId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Vpn(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameIndex(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SlotIndex(pub usize);

impl fmt::Display for AsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Vpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replacement policy chosen per address space at `exec` time.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PolicyKind {
    #[default]
    Recency,
    Optimal,
}

/// Kernel-wide sizing, fixed at boot.
#[derive(Clone, Debug)]
pub struct VmConfig {
    pub num_frames: usize,
    pub num_swap_slots: usize,
    pub resident_quota: usize,
    pub policy: PolicyKind,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            num_frames: 32,
            num_swap_slots: 1024,
            resident_quota: DEFAULT_RESIDENT_QUOTA,
            policy: PolicyKind::Recency,
        }
    }
}

/// Fault-path counters, kept by the kernel and exposed read-only.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VmStats {
    pub page_faults: usize,
    pub victim_write_backs: usize,
}

/// Free/allocated partition over a contiguous index range. Backs both the
/// physical frame pool and the swap slot table.
#[derive(Debug)]
pub struct Bitmap {
    occupied: Vec<bool>,
}

impl Bitmap {
    pub fn new(entries_count: usize) -> Self {
        assert!(entries_count > 0);
        Self {
            occupied: vec![false; entries_count],
        }
    }

    /// Marks and returns the lowest free index, or `None` if exhausted.
    pub fn find(&mut self) -> Option<usize> {
        for i in 0..self.occupied.len() {
            if !self.occupied[i] {
                self.occupied[i] = true;
                return Some(i);
            }
        }
        None
    }

    /// Releasing an index that was never allocated is a programming error.
    pub fn clear(&mut self, index: usize) {
        assert!(self.occupied[index], "index {} was not allocated", index);
        self.occupied[index] = false;
    }

    pub fn num_clear(&self) -> usize {
        self.occupied.iter().filter(|o| !**o).count()
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }
}
