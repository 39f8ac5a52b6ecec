use crate::memory::frame_allocator::FrameAllocator;
use crate::memory::page_table::PageTable;
use crate::memory::replacement::{make_policy, ReplacementPolicy};
use crate::shared::contracts::ExecutableImage;
use crate::shared::definitions::{AsId, PolicyKind, Vpn, PAGE_SIZE, USER_STACK_SIZE};
use crate::shared::errors::{VmError, VmResult};
use crate::storage::swap::SwapStore;
use parking_lot::Mutex;
use std::fmt;

fn div_round_up(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

/// One running process's virtual address space: a linear page table with a
/// swap slot pre-assigned per page, a resident-set quota, and an owned
/// replacement policy. Construction performs no frame allocation at all;
/// pages come in on demand through the fault handler.
#[derive(Debug)]
pub struct AddressSpace {
    id: AsId,
    page_table: PageTable,
    resident_count: usize,
    quota: usize,
    pub(crate) policy: Box<dyn ReplacementPolicy>,
}

impl AddressSpace {
    /// Builds the space from `image`: sizes the page table from the
    /// segment sizes plus the stack allowance, reserves one swap slot per
    /// page, and copies the image into those slots (zero-filled where the
    /// image has no bytes).
    ///
    /// Fails with `CapacityExhausted` if global frame or swap capacity
    /// cannot cover `num_pages` right now. The frame half of that check is
    /// conservative admission control: demand paging reserves no frame
    /// here.
    pub fn new(
        id: AsId,
        image: &dyn ExecutableImage,
        quota: usize,
        policy: PolicyKind,
        frames: &Mutex<FrameAllocator>,
        swap: &SwapStore,
    ) -> VmResult<Self> {
        assert!(quota > 0);

        let segments = image.segments();
        let size: usize = segments.iter().map(|s| s.size).sum::<usize>() + USER_STACK_SIZE;
        let num_pages = div_round_up(size, PAGE_SIZE);

        if frames.lock().num_clear() < num_pages {
            return Err(VmError::CapacityExhausted { resource: "frames" });
        }
        let slots = swap.reserve_many(num_pages)?;

        log::debug!(
            "initializing address space {}, num pages {}, size {}",
            id,
            num_pages,
            num_pages * PAGE_SIZE
        );

        // Stage the whole image in one buffer, then push it page by page
        // into the reserved slots. Uninitialized data and the stack stay
        // zero.
        let mut staging = vec![0u8; num_pages * PAGE_SIZE];
        for seg in &segments {
            let Some(file_offset) = seg.file_offset else {
                continue;
            };
            if seg.size == 0 {
                continue;
            }
            log::debug!(
                "loading segment at {:#x}, size {}",
                seg.virtual_addr,
                seg.size
            );
            image.read_range(
                &mut staging[seg.virtual_addr..seg.virtual_addr + seg.size],
                file_offset,
            )?;
        }
        for (i, slot) in slots.iter().enumerate() {
            swap.write(*slot, &staging[i * PAGE_SIZE..(i + 1) * PAGE_SIZE])?;
        }

        Ok(Self {
            id,
            page_table: PageTable::new(slots),
            resident_count: 0,
            quota,
            policy: make_policy(policy),
        })
    }

    pub fn id(&self) -> AsId {
        self.id
    }

    pub fn num_pages(&self) -> usize {
        self.page_table.len()
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn resident_count(&self) -> usize {
        self.resident_count
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub(crate) fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    pub(crate) fn set_resident_count(&mut self, n: usize) {
        debug_assert!(n <= self.quota);
        self.resident_count = n;
    }

    /// Maps `vaddr` to its VPN, out-of-range access being a kernel
    /// invariant violation by the caller.
    pub fn vpn_of(&self, vaddr: usize) -> VmResult<Vpn> {
        let vpn = Vpn(vaddr / PAGE_SIZE);
        if vpn.0 >= self.num_pages() {
            return Err(VmError::OutOfRangeAccess {
                asid: self.id,
                vpn,
                num_pages: self.num_pages(),
            });
        }
        Ok(vpn)
    }

    /// Returns every resident frame to the allocator and every swap slot
    /// to the store. The page table is discarded with `self`.
    pub fn destroy(mut self, frames: &Mutex<FrameAllocator>, swap: &SwapStore) {
        log::debug!("destroying address space {}", self.id);
        let mut frame_pool = frames.lock();
        for entry in self.page_table.entries() {
            if entry.valid {
                let frame = entry
                    .physical_frame
                    .expect("valid entry must hold a frame");
                frame_pool.release(frame);
            }
            swap.release(entry.swap_slot);
        }
        self.resident_count = 0;
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SpaceId: {}, page table dump: {} pages in total",
            self.id,
            self.num_pages()
        )?;
        write!(f, "{}", self.page_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::BufImage;
    use crate::shared::definitions::SlotIndex;
    use crate::storage::device::MemDevice;

    fn globals(num_frames: usize, num_slots: usize) -> (Mutex<FrameAllocator>, SwapStore) {
        (
            Mutex::new(FrameAllocator::new(num_frames)),
            SwapStore::new(num_slots, Box::new(MemDevice::new(num_slots))),
        )
    }

    fn image_of(code: Vec<u8>) -> BufImage {
        BufImage::new(code, Vec::new(), 0)
    }

    #[test]
    fn num_pages_rounds_up_with_stack_allowance() {
        let (frames, swap) = globals(32, 64);
        let image = image_of(vec![0xAB; PAGE_SIZE + 1]);
        let space = AddressSpace::new(
            AsId(0),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();
        // code rounds to 2 pages worth plus 1024/128 = 8 stack pages
        assert_eq!(space.num_pages(), 2 + USER_STACK_SIZE / PAGE_SIZE);
        assert_eq!(space.resident_count(), 0);
    }

    #[test]
    fn construction_reserves_one_slot_per_page() {
        let (frames, swap) = globals(32, 64);
        let before = swap.num_clear();
        let image = image_of(vec![1, 2, 3]);
        let space = AddressSpace::new(
            AsId(1),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();
        assert_eq!(before - swap.num_clear(), space.num_pages());
        // no frame allocated: pure demand paging
        assert_eq!(frames.lock().num_clear(), 32);
    }

    #[test]
    fn image_bytes_land_in_swap_slots() {
        let (frames, swap) = globals(32, 64);
        let mut code = vec![0u8; PAGE_SIZE * 2];
        code[0] = 0xDE;
        code[PAGE_SIZE] = 0xAD;
        let image = image_of(code);
        let space = AddressSpace::new(
            AsId(2),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();

        let mut page = vec![0u8; PAGE_SIZE];
        let slot0 = space.page_table().entry(Vpn(0)).unwrap().swap_slot;
        swap.read(slot0, &mut page).unwrap();
        assert_eq!(page[0], 0xDE);

        let slot1 = space.page_table().entry(Vpn(1)).unwrap().swap_slot;
        swap.read(slot1, &mut page).unwrap();
        assert_eq!(page[0], 0xAD);

        // stack pages are zero-filled
        let last = Vpn(space.num_pages() - 1);
        let slot_last = space.page_table().entry(last).unwrap().swap_slot;
        swap.read(slot_last, &mut page).unwrap();
        assert_eq!(page, vec![0u8; PAGE_SIZE]);
    }

    #[test]
    fn admission_fails_when_frames_short() {
        let (frames, swap) = globals(2, 64);
        let image = image_of(vec![0; PAGE_SIZE]);
        let err = AddressSpace::new(
            AsId(3),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap_err();
        assert!(matches!(err, VmError::CapacityExhausted { resource: "frames" }));
        assert_eq!(swap.num_clear(), 64);
    }

    #[test]
    fn admission_fails_when_swap_short() {
        let (frames, swap) = globals(32, 4);
        let image = image_of(vec![0; PAGE_SIZE]);
        let err = AddressSpace::new(
            AsId(4),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VmError::CapacityExhausted {
                resource: "swap slots"
            }
        ));
    }

    #[test]
    fn destroy_returns_everything_to_the_pools() {
        let (frames, swap) = globals(16, 64);
        let frames_before = frames.lock().num_clear();
        let slots_before = swap.num_clear();

        let image = image_of(vec![7; 100]);
        let mut space = AddressSpace::new(
            AsId(5),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();

        // fake one resident page so destroy has a frame to give back
        let frame = frames.lock().find().unwrap();
        let entry = space.page_table_mut().entry_mut(Vpn(0)).unwrap();
        entry.physical_frame = Some(frame);
        entry.valid = true;
        space.set_resident_count(1);

        space.destroy(&frames, &swap);
        assert_eq!(frames.lock().num_clear(), frames_before);
        assert_eq!(swap.num_clear(), slots_before);
    }

    #[test]
    fn vpn_of_checks_range() {
        let (frames, swap) = globals(16, 64);
        let image = image_of(Vec::new());
        let space = AddressSpace::new(
            AsId(6),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();

        let last = space.num_pages() - 1;
        assert_eq!(space.vpn_of(last * PAGE_SIZE).unwrap(), Vpn(last));
        assert!(matches!(
            space.vpn_of(space.num_pages() * PAGE_SIZE),
            Err(VmError::OutOfRangeAccess { .. })
        ));
    }

    #[test]
    fn slots_stay_fixed_for_lifetime() {
        let (frames, swap) = globals(16, 64);
        let image = image_of(vec![1; 10]);
        let space = AddressSpace::new(
            AsId(7),
            &image,
            2,
            PolicyKind::Recency,
            &frames,
            &swap,
        )
        .unwrap();
        let assigned: Vec<SlotIndex> = space
            .page_table()
            .entries()
            .map(|e| e.swap_slot)
            .collect();
        let mut deduped = assigned.clone();
        deduped.sort_by_key(|s| s.0);
        deduped.dedup();
        assert_eq!(deduped.len(), assigned.len());
    }
}
