use crate::shared::errors::VmError;

/// User-mode exceptions delivered by the simulator. Only page faults and
/// system calls are handled; everything else is fatal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Exception {
    /// Hardware could not translate `vaddr`.
    PageFault { vaddr: usize },
    /// Explicit request into the kernel; the code selects the service.
    Syscall { code: u32 },
    /// Write attempted to a read-only page.
    ReadOnly { vaddr: usize },
    AddressError,
    BusError,
    Overflow,
    IllegalInstruction,
}

/// What the simulator should do with the program counter after the
/// boundary returns.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resume {
    /// Re-execute the faulting instruction from scratch.
    Retry,
    /// Step past the instruction (system-call convention).
    Advance,
}

impl Exception {
    pub(crate) fn unexpected(self) -> VmError {
        let name = match self {
            Exception::PageFault { .. } => "page fault",
            Exception::Syscall { .. } => "syscall",
            Exception::ReadOnly { .. } => "read-only violation",
            Exception::AddressError => "address error",
            Exception::BusError => "bus error",
            Exception::Overflow => "arithmetic overflow",
            Exception::IllegalInstruction => "illegal instruction",
        };
        VmError::UnexpectedException(name)
    }
}
