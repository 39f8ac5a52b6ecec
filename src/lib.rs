//! Virtual-memory subsystem of a teaching operating-system kernel:
//! per-process address spaces with pure demand paging, a fixed pool of
//! physical frames, a swap-backed paging store, and interchangeable
//! page-replacement policies (recency stack and offline-optimal).
//!
//! The instruction simulator, scheduler and file system are external
//! collaborators; they reach this subsystem through [`kernel::Kernel`]
//! and the traits in [`shared::contracts`].

pub mod kernel;
pub mod loader;
pub mod memory;
pub mod shared;
pub mod storage;

pub use kernel::exception::{Exception, Resume};
pub use kernel::Kernel;
pub use shared::definitions::{AsId, PolicyKind, VmConfig, VmStats, Vpn, PAGE_SIZE};
pub use shared::errors::{VmError, VmResult};
