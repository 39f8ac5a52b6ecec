use crate::shared::definitions::{FrameIndex, SlotIndex, Vpn};
use std::fmt;

/// One virtual page's translation state. `swap_slot` is assigned at
/// address-space construction and never changes afterwards.
#[derive(Debug)]
pub struct TranslationEntry {
    pub virtual_page: Vpn,
    pub physical_frame: Option<FrameIndex>,
    pub swap_slot: SlotIndex,
    pub valid: bool,
    pub use_flag: bool,
    pub dirty: bool,
    /// Advisory; no protection-fault path enforces it.
    pub read_only: bool,
}

impl TranslationEntry {
    pub fn new(virtual_page: Vpn, swap_slot: SlotIndex) -> Self {
        Self {
            virtual_page,
            physical_frame: None,
            swap_slot,
            valid: false,
            use_flag: false,
            dirty: false,
            read_only: false,
        }
    }
}

/// Linear page table indexed by VPN.
#[derive(Debug)]
pub struct PageTable {
    entries: Vec<TranslationEntry>,
}

impl PageTable {
    pub fn new(slots: Vec<SlotIndex>) -> Self {
        let entries = slots
            .into_iter()
            .enumerate()
            .map(|(vpn, slot)| TranslationEntry::new(Vpn(vpn), slot))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, vpn: Vpn) -> Option<&TranslationEntry> {
        self.entries.get(vpn.0)
    }

    pub fn entry_mut(&mut self, vpn: Vpn) -> Option<&mut TranslationEntry> {
        self.entries.get_mut(vpn.0)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.entries.iter()
    }

    /// Resident VPNs in ascending order; also the victim-scan order for
    /// the optimal policy.
    pub fn resident_vpns(&self) -> Vec<Vpn> {
        self.entries
            .iter()
            .filter(|e| e.valid)
            .map(|e| e.virtual_page)
            .collect()
    }
}

impl fmt::Display for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tVirtPage\tPhysPage\tSwapSlot\tValid\tUse\tDirty")?;
        for e in &self.entries {
            let frame = match e.physical_frame {
                Some(frame) => frame.0.to_string(),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "\t{}\t\t{}\t\t{}\t\t{}\t{}\t{}",
                e.virtual_page,
                frame,
                e.swap_slot,
                e.valid as u8,
                e.use_flag as u8,
                e.dirty as u8,
            )?;
        }
        Ok(())
    }
}
