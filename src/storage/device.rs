use crate::shared::contracts::SectorDevice;
use crate::shared::definitions::{SlotIndex, PAGE_SIZE};
use crate::storage::fileio::{self, FileIO};
use parking_lot::Mutex;
use std::fs::File;
use std::io;
use std::path::Path;

/// In-memory backing store. The default for tests and for runs that do
/// not need the swap contents to outlive the kernel.
#[derive(Debug)]
pub struct MemDevice {
    sectors: Mutex<Vec<u8>>,
}

impl MemDevice {
    pub fn new(num_slots: usize) -> Self {
        assert!(num_slots > 0);
        Self {
            sectors: Mutex::new(vec![0u8; num_slots * PAGE_SIZE]),
        }
    }
}

impl SectorDevice for MemDevice {
    fn read_sector(&self, slot: SlotIndex, buf: &mut [u8]) -> io::Result<()> {
        let sectors = self.sectors.lock();
        let start = slot.0 * PAGE_SIZE;
        buf.copy_from_slice(&sectors[start..start + PAGE_SIZE]);
        Ok(())
    }

    fn write_sector(&self, slot: SlotIndex, buf: &[u8]) -> io::Result<()> {
        let mut sectors = self.sectors.lock();
        let start = slot.0 * PAGE_SIZE;
        sectors[start..start + PAGE_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

/// File-backed swap device, one page per sector at `slot * PAGE_SIZE`.
pub struct FileDevice {
    file: File,
}

impl FileDevice {
    /// Creates (or truncates into existence) the swap file and sizes it
    /// so every slot is readable before its first write.
    pub fn create(path: &Path, num_slots: usize) -> io::Result<Self> {
        let io = fileio::default();
        let file = io.create_file(path)?;
        file.set_len((num_slots * PAGE_SIZE) as u64)?;
        Ok(Self { file })
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let io = fileio::default();
        let file = io.open_file(path, true)?;
        Ok(Self { file })
    }
}

impl SectorDevice for FileDevice {
    fn read_sector(&self, slot: SlotIndex, buf: &mut [u8]) -> io::Result<()> {
        fileio::default().read(&self.file, buf, (slot.0 * PAGE_SIZE) as u64)
    }

    fn write_sector(&self, slot: SlotIndex, buf: &[u8]) -> io::Result<()> {
        fileio::default().write(&self.file, buf, (slot.0 * PAGE_SIZE) as u64)
    }
}
