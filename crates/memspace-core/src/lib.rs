//! # memspace-core
//!
//! A logical model of a memory allocator over a bounded, linear address
//! space. Addresses are integers and memory is a numeric range; no real
//! memory is touched.
//!
//! - [`region`]: the `(start, length)` range record.
//! - [`list`]: the ordered region container.
//! - [`malloc`]: the first-fit allocator with `malloc`, `free`, and `defrag`.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod list;
pub mod malloc;
pub mod region;

pub use config::{AllocatorConfig, FreeMode};
pub use error::{AllocatorError, InvariantViolation, ListError};
pub use list::{RegionHandle, RegionList};
pub use malloc::{Allocator, SharedAllocator, SpaceSnapshot};
pub use region::Region;
