//! Region bookkeeping containers.
//!
//! A [`RegionList`] is a plain ordered container: it keeps regions in
//! insertion order and never checks them against each other. Keeping the
//! regions disjoint is the allocator's job.

pub mod region_list;

pub use region_list::{Entries, Iter, RegionHandle, RegionList};
