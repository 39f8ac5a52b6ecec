use crate::memory::address_space::AddressSpace;
use crate::memory::fault::PageFaultHandler;
use crate::memory::frame_allocator::FrameAllocator;
use crate::memory::main_memory::MainMemory;
use crate::shared::contracts::{ExecutableImage, SectorDevice};
use crate::shared::definitions::{AsId, PolicyKind, VmConfig, VmStats, Vpn, PAGE_SIZE};
use crate::shared::errors::{VmError, VmResult};
use crate::storage::swap::SwapStore;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod exception;

use exception::{Exception, Resume};

/// The kernel context: the global pools built once at boot, the table of
/// live address spaces, and the exception boundary. No singletons; every
/// component reaches the allocators through this struct.
///
/// Lock order is fixed: an address space's lock is taken before the
/// global frame/memory locks, never the other way around.
pub struct Kernel {
    config: VmConfig,
    frames: Mutex<FrameAllocator>,
    memory: Mutex<MainMemory>,
    swap: SwapStore,
    spaces: DashMap<AsId, Mutex<AddressSpace>>,
    next_asid: AtomicUsize,
    stats: Mutex<VmStats>,
}

impl Kernel {
    pub fn new(config: VmConfig, device: Box<dyn SectorDevice>) -> Self {
        Self {
            frames: Mutex::new(FrameAllocator::new(config.num_frames)),
            memory: Mutex::new(MainMemory::new(config.num_frames)),
            swap: SwapStore::new(config.num_swap_slots, device),
            spaces: DashMap::new(),
            next_asid: AtomicUsize::new(0),
            stats: Mutex::new(VmStats::default()),
            config,
        }
    }

    /// Loads `image` into a fresh address space with the kernel's default
    /// policy and quota. No page is resident afterwards.
    pub fn exec(&self, image: &dyn ExecutableImage) -> VmResult<AsId> {
        self.exec_with(image, self.config.policy, self.config.resident_quota)
    }

    pub fn exec_with(
        &self,
        image: &dyn ExecutableImage,
        policy: PolicyKind,
        quota: usize,
    ) -> VmResult<AsId> {
        let id = AsId(self.next_asid.fetch_add(1, Ordering::Relaxed));
        let space = AddressSpace::new(id, image, quota, policy, &self.frames, &self.swap)?;
        log::debug!("spaceId:{}", id);
        self.spaces.insert(id, Mutex::new(space));
        Ok(id)
    }

    /// Process exit: tears the address space down, returning its frames
    /// and swap slots to the global pools.
    pub fn exit(&self, asid: AsId) -> VmResult<()> {
        let (_, space) = self
            .spaces
            .remove(&asid)
            .ok_or(VmError::UnknownAddressSpace(asid))?;
        space.into_inner().destroy(&self.frames, &self.swap);
        Ok(())
    }

    /// The exception boundary. Page faults resolve synchronously and ask
    /// the simulator to retry the instruction; syscalls step past it; any
    /// other exception kind is a kernel invariant violation, as is any
    /// error bubbling out of fault resolution — the caller treats `Err`
    /// as a kernel panic.
    pub fn handle_exception(&self, asid: AsId, exception: Exception) -> VmResult<Resume> {
        match exception {
            Exception::PageFault { vaddr } => {
                self.page_fault(asid, vaddr)?;
                Ok(Resume::Retry)
            }
            Exception::Syscall { code } => {
                log::trace!("syscall {} from space {}", code, asid);
                Ok(Resume::Advance)
            }
            other => Err(other.unexpected()),
        }
    }

    /// Resolves a page fault at `vaddr` in `asid`'s space and returns the
    /// faulted-in VPN. The space's lock is held across the whole
    /// resolution, so it is atomic with respect to other threads.
    pub fn page_fault(&self, asid: AsId, vaddr: usize) -> VmResult<Vpn> {
        let space = self
            .spaces
            .get(&asid)
            .ok_or(VmError::UnknownAddressSpace(asid))?;
        let mut space = space.lock();

        let handler = PageFaultHandler::new(&self.frames, &self.memory, &self.swap);
        let mut stats = self.stats.lock();
        let vpn = handler.resolve(&mut space, vaddr, &mut stats)?;
        drop(stats);

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", *space);
        }
        Ok(vpn)
    }

    /// Copies out of a resident page. The page must have been faulted in.
    pub fn read_page(&self, asid: AsId, vpn: Vpn) -> VmResult<Vec<u8>> {
        let space = self
            .spaces
            .get(&asid)
            .ok_or(VmError::UnknownAddressSpace(asid))?;
        let mut space = space.lock();

        let num_pages = space.num_pages();
        let entry = space
            .page_table_mut()
            .entry_mut(vpn)
            .ok_or(VmError::OutOfRangeAccess {
                asid,
                vpn,
                num_pages,
            })?;
        assert!(entry.valid, "read of a non-resident page");
        entry.use_flag = true;
        let frame = entry.physical_frame.expect("valid entry must hold a frame");

        Ok(self.memory.lock().frame(frame).to_vec())
    }

    /// Writes into a resident page and marks it dirty, so the next
    /// eviction synchronizes the swap slot. The page must have been
    /// faulted in; `offset + data.len()` must stay inside the page.
    pub fn write_page(&self, asid: AsId, vpn: Vpn, offset: usize, data: &[u8]) -> VmResult<()> {
        assert!(offset + data.len() <= PAGE_SIZE);
        let space = self
            .spaces
            .get(&asid)
            .ok_or(VmError::UnknownAddressSpace(asid))?;
        let mut space = space.lock();

        let num_pages = space.num_pages();
        let entry = space
            .page_table_mut()
            .entry_mut(vpn)
            .ok_or(VmError::OutOfRangeAccess {
                asid,
                vpn,
                num_pages,
            })?;
        assert!(entry.valid, "write to a non-resident page");
        entry.use_flag = true;
        entry.dirty = true;
        let frame = entry.physical_frame.expect("valid entry must hold a frame");

        self.memory.lock().write(frame, offset, data);
        Ok(())
    }

    /// Diagnostic page-table dump, informational only.
    pub fn dump(&self, asid: AsId) -> VmResult<String> {
        let space = self
            .spaces
            .get(&asid)
            .ok_or(VmError::UnknownAddressSpace(asid))?;
        let space = space.lock();
        Ok(space.to_string())
    }

    pub fn stats(&self) -> VmStats {
        *self.stats.lock()
    }

    pub fn free_frames(&self) -> usize {
        self.frames.lock().num_clear()
    }

    pub fn free_swap_slots(&self) -> usize {
        self.swap.num_clear()
    }
}
