use crate::shared::contracts::SectorDevice;
use crate::shared::definitions::{Bitmap, SlotIndex, PAGE_SIZE};
use crate::shared::errors::{VmError, VmResult};
use parking_lot::Mutex;

/// Swap-backed paging store. Slot allocation is global; reads and writes
/// are synchronous, page-sized, and always succeed once a slot has been
/// reserved (an I/O failure from the device is fatal, like every other
/// error here).
pub struct SwapStore {
    slots: Mutex<Bitmap>,
    device: Box<dyn SectorDevice>,
}

impl SwapStore {
    pub fn new(num_slots: usize, device: Box<dyn SectorDevice>) -> Self {
        Self {
            slots: Mutex::new(Bitmap::new(num_slots)),
            device,
        }
    }

    pub fn reserve(&self) -> VmResult<SlotIndex> {
        let mut slots = self.slots.lock();
        slots
            .find()
            .map(SlotIndex)
            .ok_or(VmError::CapacityExhausted {
                resource: "swap slots",
            })
    }

    /// Reserves `n` distinct slots atomically. Either all are marked or
    /// none: insufficient capacity fails before any slot is taken.
    pub fn reserve_many(&self, n: usize) -> VmResult<Vec<SlotIndex>> {
        let mut slots = self.slots.lock();
        if slots.num_clear() < n {
            return Err(VmError::CapacityExhausted {
                resource: "swap slots",
            });
        }
        let reserved = (0..n)
            .map(|_| {
                let index = slots.find().expect("free count checked above");
                SlotIndex(index)
            })
            .collect();
        Ok(reserved)
    }

    pub fn release(&self, slot: SlotIndex) {
        self.slots.lock().clear(slot.0);
    }

    pub fn num_clear(&self) -> usize {
        self.slots.lock().num_clear()
    }

    pub fn read(&self, slot: SlotIndex, buf: &mut [u8]) -> VmResult<()> {
        assert_eq!(buf.len(), PAGE_SIZE);
        self.device.read_sector(slot, buf)?;
        Ok(())
    }

    pub fn write(&self, slot: SlotIndex, buf: &[u8]) -> VmResult<()> {
        assert_eq!(buf.len(), PAGE_SIZE);
        self.device.write_sector(slot, buf)?;
        Ok(())
    }
}

impl std::fmt::Debug for SwapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapStore")
            .field("free_slots", &self.num_clear())
            .finish()
    }
}
