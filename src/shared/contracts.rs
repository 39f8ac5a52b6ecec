use crate::shared::definitions::SlotIndex;
use std::io;

/// One region of an executable image. `file_offset` is `None` for
/// segments that occupy address space but carry no file bytes
/// (uninitialized data); those are zero-filled at load.
#[derive(Clone, Copy, Default, Debug)]
pub struct Segment {
    pub virtual_addr: usize,
    pub size: usize,
    pub file_offset: Option<u64>,
}

/// Executable image collaborator, consumed once at address-space
/// construction.
pub trait ExecutableImage {
    /// All segments in image order, including zero-sized ones.
    fn segments(&self) -> Vec<Segment>;

    /// Fills `buf` from the image bytes starting at `offset`.
    fn read_range(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

/// Synchronous page-sized backing store addressed by slot index. Calls
/// block until complete; there is no timeout semantics.
pub trait SectorDevice: Send + Sync {
    fn read_sector(&self, slot: SlotIndex, buf: &mut [u8]) -> io::Result<()>;
    fn write_sector(&self, slot: SlotIndex, buf: &[u8]) -> io::Result<()>;
}
