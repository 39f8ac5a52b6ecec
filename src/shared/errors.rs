use crate::shared::definitions::{AsId, Vpn};
use std::io;
use thiserror::Error;

/// Every error in this subsystem is fatal: nothing here retries or
/// recovers, callers at the exception boundary treat `Err` as a kernel
/// panic.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("no free {resource} left")]
    CapacityExhausted { resource: &'static str },

    #[error("virtual page {vpn} outside page table of space {asid} ({num_pages} pages)")]
    OutOfRangeAccess {
        asid: AsId,
        vpn: Vpn,
        num_pages: usize,
    },

    #[error("unexpected user-mode exception: {0}")]
    UnexpectedException(&'static str),

    #[error("no address space with id {0}")]
    UnknownAddressSpace(AsId),

    #[error("backing store i/o failed: {0}")]
    Io(#[from] io::Error),
}

pub type VmResult<T> = Result<T, VmError>;
