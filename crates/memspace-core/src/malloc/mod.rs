//! Simulated memory allocation.
//!
//! First-fit allocation over a single bounded address space:
//! - `malloc` splits the first large-enough free region from the front
//! - `free` moves a region back to the free list without merging
//! - `defrag` sorts the free list and coalesces neighbours on request

pub mod allocator;
pub mod shared;
pub mod snapshot;

pub use allocator::{Allocator, AllocatorLogLevel, AllocatorLogRecord, LIFECYCLE_LOG_CAPACITY};
pub use shared::SharedAllocator;
pub use snapshot::SpaceSnapshot;
