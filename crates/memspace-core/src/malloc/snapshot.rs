//! Serializable copy of an allocator's two lists.

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Point-in-time view of an [`Allocator`](super::Allocator).
///
/// Regions are listed in list order, not address order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub max_size: usize,
    pub free: Vec<Region>,
    pub allocated: Vec<Region>,
}

impl SpaceSnapshot {
    /// Total length of the free regions.
    #[must_use]
    pub fn free_total(&self) -> usize {
        self.free.iter().map(|r| r.length).sum()
    }

    /// Total length of the allocated regions.
    #[must_use]
    pub fn allocated_total(&self) -> usize {
        self.allocated.iter().map(|r| r.length).sum()
    }

    /// Free regions in ascending address order.
    #[must_use]
    pub fn free_by_address(&self) -> Vec<Region> {
        let mut free = self.free.clone();
        free.sort_by_key(|r| r.start);
        free
    }
}
