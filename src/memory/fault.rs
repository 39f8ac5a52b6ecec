use crate::memory::address_space::AddressSpace;
use crate::memory::frame_allocator::FrameAllocator;
use crate::memory::main_memory::MainMemory;
use crate::shared::definitions::{VmStats, Vpn};
use crate::shared::errors::{VmError, VmResult};
use crate::storage::swap::SwapStore;
use parking_lot::Mutex;

/// Synchronous fault resolution over the global pools. One fault runs to
/// completion before control returns to the faulting execution context;
/// the caller holds the address space's lock for the whole of `resolve`,
/// so no other thread observes a torn page table.
pub struct PageFaultHandler<'a> {
    frames: &'a Mutex<FrameAllocator>,
    memory: &'a Mutex<MainMemory>,
    swap: &'a SwapStore,
}

impl<'a> PageFaultHandler<'a> {
    pub fn new(
        frames: &'a Mutex<FrameAllocator>,
        memory: &'a Mutex<MainMemory>,
        swap: &'a SwapStore,
    ) -> Self {
        Self {
            frames,
            memory,
            swap,
        }
    }

    /// Brings the page containing `vaddr` into a physical frame, evicting
    /// a victim from this space's own resident set if the quota is full.
    /// Returns the faulted-in VPN; the faulting instruction is then
    /// re-executed from scratch, no program-counter advance happens here.
    pub fn resolve(
        &self,
        space: &mut AddressSpace,
        vaddr: usize,
        stats: &mut VmStats,
    ) -> VmResult<Vpn> {
        let vpn = space.vpn_of(vaddr)?;
        stats.page_faults += 1;

        if space.resident_count() < space.quota() {
            self.demand_in(space, vpn)?;
        } else {
            self.swap_in(space, vpn, stats)?;
        }

        space.policy.on_reference(vpn);
        debug_assert!(space.resident_count() <= space.quota());
        Ok(vpn)
    }

    /// Below quota: take a fresh frame, no eviction.
    fn demand_in(&self, space: &mut AddressSpace, vpn: Vpn) -> VmResult<()> {
        let frame = self
            .frames
            .lock()
            .find()
            .ok_or(VmError::CapacityExhausted { resource: "frames" })?;

        let slot = space
            .page_table()
            .entry(vpn)
            .expect("vpn range-checked by caller")
            .swap_slot;
        self.swap.read(slot, self.memory.lock().frame_mut(frame))?;

        let entry = space
            .page_table_mut()
            .entry_mut(vpn)
            .expect("vpn range-checked by caller");
        entry.physical_frame = Some(frame);
        entry.valid = true;
        entry.use_flag = true;
        entry.dirty = false;
        space.set_resident_count(space.resident_count() + 1);

        log::debug!("demand page {} in (frame {})", vpn, frame);
        Ok(())
    }

    /// At quota: evict a victim (writing it back first if dirty) and reuse
    /// its frame. `resident_count` is unchanged.
    fn swap_in(&self, space: &mut AddressSpace, vpn: Vpn, stats: &mut VmStats) -> VmResult<()> {
        let resident = space.page_table().resident_vpns();
        let victim_vpn = space.policy.select_victim(&resident);

        let victim = space
            .page_table()
            .entry(victim_vpn)
            .expect("policy returned a resident page");
        let frame = victim
            .physical_frame
            .expect("resident page must hold a frame");
        let victim_slot = victim.swap_slot;

        if victim.dirty {
            log::debug!("dirty page {} write back", victim_vpn);
            let memory = self.memory.lock();
            self.swap.write(victim_slot, memory.frame(frame))?;
            stats.victim_write_backs += 1;
        }

        let slot = space
            .page_table()
            .entry(vpn)
            .expect("vpn range-checked by caller")
            .swap_slot;
        self.swap.read(slot, self.memory.lock().frame_mut(frame))?;

        let victim = space
            .page_table_mut()
            .entry_mut(victim_vpn)
            .expect("policy returned a resident page");
        victim.physical_frame = None;
        victim.valid = false;
        victim.dirty = false;

        let entry = space
            .page_table_mut()
            .entry_mut(vpn)
            .expect("vpn range-checked by caller");
        entry.physical_frame = Some(frame);
        entry.valid = true;
        entry.use_flag = true;
        entry.dirty = false;

        log::debug!(
            "swap page {} out, demand page {} in (frame {})",
            victim_vpn,
            vpn,
            frame
        );
        Ok(())
    }
}
