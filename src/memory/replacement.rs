use crate::shared::definitions::{PolicyKind, Vpn};
use std::collections::VecDeque;
use std::fmt;

/// Per-address-space victim selection. `on_reference` is called on fault
/// events only, never on ordinary accesses to resident pages, so the
/// recency variant tracks "LRU among faults" rather than true per-access
/// LRU. That approximation is part of the contract.
pub trait ReplacementPolicy: Send + fmt::Debug {
    fn on_reference(&mut self, vpn: Vpn);

    /// Chooses a page to evict from `resident`, the calling address
    /// space's own resident set in ascending VPN order. Eviction never
    /// crosses address-space boundaries.
    fn select_victim(&mut self, resident: &[Vpn]) -> Vpn;
}

pub fn make_policy(kind: PolicyKind) -> Box<dyn ReplacementPolicy> {
    match kind {
        PolicyKind::Recency => Box::new(RecencyStack::new()),
        PolicyKind::Optimal => Box::new(OptimalTrace::new()),
    }
}

/// Resident VPNs ordered least-to-most recently faulted, no duplicates.
#[derive(Debug, Default)]
pub struct RecencyStack {
    stack: VecDeque<Vpn>,
}

impl RecencyStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl ReplacementPolicy for RecencyStack {
    fn on_reference(&mut self, vpn: Vpn) {
        if let Some(pos) = self.stack.iter().position(|&v| v == vpn) {
            self.stack.remove(pos);
        }
        self.stack.push_back(vpn);
        log::trace!("recency stack after ref {}: {:?}", vpn, self.stack);
    }

    fn select_victim(&mut self, _resident: &[Vpn]) -> Vpn {
        self.stack
            .pop_front()
            .expect("victim requested from an empty recency stack")
    }
}

/// Fault-reference trace with consecutive duplicates collapsed. Victim
/// selection follows Belady's rule over the trace past the cursor: the
/// resident page whose next use is farthest away (or absent) is evicted.
///
/// Live use needs the future known in advance; construct with
/// [`OptimalTrace::preloaded`] and `on_reference` will walk the cursor
/// along the trace instead of appending. The default constructor records
/// history only, which suits post-hoc analysis via
/// [`offline_fault_count`].
#[derive(Debug, Default)]
pub struct OptimalTrace {
    trace: Vec<Vpn>,
    cursor: usize,
}

impl OptimalTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preloaded(reference_string: impl IntoIterator<Item = Vpn>) -> Self {
        let mut trace: Vec<Vpn> = Vec::new();
        for vpn in reference_string {
            if trace.last() != Some(&vpn) {
                trace.push(vpn);
            }
        }
        Self { trace, cursor: 0 }
    }

    pub fn trace(&self) -> &[Vpn] {
        &self.trace
    }
}

impl ReplacementPolicy for OptimalTrace {
    fn on_reference(&mut self, vpn: Vpn) {
        match self.trace.get(self.cursor) {
            // preloaded trace: consume the expected reference
            Some(&next) if next == vpn => self.cursor += 1,
            _ => {
                if self.trace.last() != Some(&vpn) {
                    self.trace.push(vpn);
                }
                self.cursor = self.trace.len();
            }
        }
    }

    fn select_victim(&mut self, resident: &[Vpn]) -> Vpn {
        assert!(!resident.is_empty());
        let remaining = &self.trace[self.cursor..];
        let mut victim = resident[0];
        let mut farthest = next_use(remaining, resident[0]);
        for &page in &resident[1..] {
            let dist = next_use(remaining, page);
            if dist > farthest {
                farthest = dist;
                victim = page;
            }
        }
        victim
    }
}

/// Distance to the next occurrence of `page`, `usize::MAX` if never
/// referenced again.
fn next_use(remaining: &[Vpn], page: Vpn) -> usize {
    remaining
        .iter()
        .position(|&r| r == page)
        .unwrap_or(usize::MAX)
}

/// Replays `trace` against an empty cache of `capacity` frames using the
/// farthest-next-use rule and returns the total number of misses. Used for
/// comparative analysis, not live decision-making.
pub fn offline_fault_count(trace: &[Vpn], capacity: usize) -> usize {
    assert!(capacity > 0);
    let mut resident: Vec<Vpn> = Vec::with_capacity(capacity);
    let mut faults = 0;
    for (pos, &page) in trace.iter().enumerate() {
        if resident.contains(&page) {
            continue;
        }
        faults += 1;
        if resident.len() < capacity {
            resident.push(page);
            continue;
        }
        let future = &trace[pos + 1..];
        let mut victim = 0;
        let mut farthest = next_use(future, resident[0]);
        for (slot, &p) in resident.iter().enumerate().skip(1) {
            let dist = next_use(future, p);
            if dist > farthest {
                farthest = dist;
                victim = slot;
            }
        }
        resident[victim] = page;
    }
    faults
}
