//! Core allocator state.
//!
//! Owns the `allocated` and `free` region lists of one simulated address
//! space and implements first-fit `malloc`, `free`, and `defrag` over them.
//! Addresses are plain offsets into `[0, max_size)`; nothing is backed by
//! real memory.
//!
//! Every operation appends a structured lifecycle record (see
//! [`AllocatorLogRecord`]) so callers can audit decisions after the fact.
//! At most [`LIFECYCLE_LOG_CAPACITY`] records are retained; the oldest are
//! evicted first.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use super::snapshot::SpaceSnapshot;
use crate::config::{AllocatorConfig, FreeMode};
use crate::error::{AllocatorError, InvariantViolation, ListError};
use crate::list::RegionList;
use crate::region::Region;

/// Upper bound on retained lifecycle records between drains.
pub const LIFECYCLE_LOG_CAPACITY: usize = 4096;

/// Allocator lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured allocator lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatorLogRecord {
    /// Monotonic decision/event id.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    /// Severity level.
    pub level: AllocatorLogLevel,
    /// API symbol (`malloc`, `free`, `defrag`).
    pub symbol: &'static str,
    /// Event kind (`alloc`, `free`, `defrag`, `allocator_stats`, ...).
    pub event: &'static str,
    /// Address involved in the event.
    pub address: Option<usize>,
    /// Length involved in the event.
    pub length: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details for debugging.
    pub details: String,
    /// Snapshot: number of allocated regions.
    pub allocated_count: usize,
    /// Snapshot: number of free regions.
    pub free_count: usize,
    /// Snapshot: addresses currently allocated.
    pub allocated_total: usize,
    /// Snapshot: addresses currently free.
    pub free_total: usize,
}

/// First-fit allocator over a bounded logical address space.
///
/// At rest, `allocated` and `free` together partition `[0, max_size)`.
#[derive(Debug, Clone)]
pub struct Allocator {
    max_size: usize,
    free_mode: FreeMode,
    /// Regions handed out by `malloc`, in allocation order.
    allocated: RegionList,
    /// Unallocated regions, in release order until the next `defrag`.
    free: RegionList,
    /// Sum of allocated lengths.
    allocated_total: usize,
    /// Monotonic lifecycle decision id.
    next_decision_id: u64,
    /// Structured allocator lifecycle records, oldest first.
    lifecycle_logs: VecDeque<AllocatorLogRecord>,
}

impl Allocator {
    /// Creates an allocator whose free list is one region spanning
    /// `[0, max_size)`.
    pub fn new(max_size: usize) -> Result<Self, AllocatorError> {
        Self::with_config(AllocatorConfig::new(max_size))
    }

    /// Creates an allocator from a full configuration.
    pub fn with_config(config: AllocatorConfig) -> Result<Self, AllocatorError> {
        if config.max_size == 0 {
            return Err(AllocatorError::ZeroCapacity);
        }
        let mut free = RegionList::new();
        free.push_back(Region::new(0, config.max_size));
        Ok(Self {
            max_size: config.max_size,
            free_mode: config.free_mode,
            allocated: RegionList::new(),
            free,
            allocated_total: 0,
            next_decision_id: 1,
            lifecycle_logs: VecDeque::new(),
        })
    }

    fn next_log_decision_id(&mut self) -> u64 {
        let id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        id
    }

    fn record_lifecycle(
        &mut self,
        level: AllocatorLogLevel,
        symbol: &'static str,
        event: &'static str,
        address: Option<usize>,
        length: Option<usize>,
        outcome: &'static str,
        details: impl Into<String>,
    ) {
        let decision_id = self.next_log_decision_id();
        let trace_id = format!("core::memspace::{}::{:016x}", symbol, decision_id);
        if self.lifecycle_logs.len() == LIFECYCLE_LOG_CAPACITY {
            self.lifecycle_logs.pop_front();
        }
        self.lifecycle_logs.push_back(AllocatorLogRecord {
            decision_id,
            trace_id,
            level,
            symbol,
            event,
            address,
            length,
            outcome,
            details: details.into(),
            allocated_count: self.allocated.len(),
            free_count: self.free.len(),
            allocated_total: self.allocated_total,
            free_total: self.free_total(),
        });
    }

    fn record_allocator_stats(&mut self, symbol: &'static str) {
        let largest = self.largest_free().unwrap_or(0);
        self.record_lifecycle(
            AllocatorLogLevel::Debug,
            symbol,
            "allocator_stats",
            None,
            None,
            "snapshot",
            format!("largest_free={};max_size={}", largest, self.max_size),
        );
    }

    /// Allocates `length` contiguous addresses, first fit by free-list order.
    ///
    /// The free list is scanned in its current order, which is release order
    /// until [`Allocator::defrag`] sorts it. Returns the start address, or
    /// `Ok(None)` if no single free region is large enough.
    pub fn malloc(&mut self, length: usize) -> Result<Option<usize>, AllocatorError> {
        if length == 0 {
            self.record_lifecycle(
                AllocatorLogLevel::Error,
                "malloc",
                "alloc_rejected",
                None,
                Some(length),
                "denied",
                "zero_length",
            );
            return Err(AllocatorError::ZeroLength);
        }

        let fit = self.free.entries().find(|(_, region)| region.length >= length);
        let Some((handle, found)) = fit else {
            let outcome = if self.free_total() >= length {
                "fragmented"
            } else {
                "oom"
            };
            self.record_lifecycle(
                AllocatorLogLevel::Info,
                "malloc",
                "alloc",
                None,
                Some(length),
                outcome,
                format!("free_regions={}", self.free.len()),
            );
            self.record_allocator_stats("malloc");
            return Ok(None);
        };

        let (block, rest) = found.split_front(length);
        let path = match rest {
            None => {
                self.free.remove_handle(handle)?;
                String::from("path=exact_fit")
            }
            Some(rest) => {
                self.free.replace(handle, rest)?;
                format!("path=split remaining={}", rest)
            }
        };
        self.allocated.push_back(block);
        self.allocated_total += length;

        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "malloc",
            "alloc",
            Some(block.start),
            Some(length),
            "success",
            path,
        );
        self.record_allocator_stats("malloc");
        Ok(Some(block.start))
    }

    /// Releases the allocated region starting at `address`.
    ///
    /// The region moves unchanged to the back of the free list; neighbours
    /// are not merged until [`Allocator::defrag`]. An address with no
    /// matching region is ignored in [`FreeMode::Parity`] and rejected in
    /// [`FreeMode::Strict`].
    pub fn free(&mut self, address: usize) -> Result<(), AllocatorError> {
        if self.allocated.is_empty() {
            self.record_lifecycle(
                AllocatorLogLevel::Error,
                "free",
                "free_empty",
                Some(address),
                None,
                "denied",
                "allocated_list_empty",
            );
            return Err(AllocatorError::EmptyAllocation);
        }

        let found = self
            .allocated
            .entries()
            .find(|(_, region)| region.start == address)
            .map(|(handle, _)| handle);
        let Some(handle) = found else {
            let rejects = self.free_mode.rejects_unknown();
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "free",
                "unknown_free_address",
                Some(address),
                None,
                if rejects { "rejected" } else { "ignored" },
                format!("mode={}", self.free_mode.as_str()),
            );
            self.record_allocator_stats("free");
            return if rejects {
                Err(AllocatorError::UnknownAddress(address))
            } else {
                Ok(())
            };
        };

        let region = self.allocated.remove_handle(handle)?;
        self.free.push_back(region);
        match self.allocated_total.checked_sub(region.length) {
            Some(next) => self.allocated_total = next,
            None => {
                self.allocated_total = self.allocated.iter().map(|r| r.length).sum();
                self.record_lifecycle(
                    AllocatorLogLevel::Error,
                    "free",
                    "invariant_allocated_total_underflow",
                    Some(address),
                    Some(region.length),
                    "recovered",
                    "checked_sub_failed",
                );
            }
        }

        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "free",
            "free",
            Some(address),
            Some(region.length),
            "success",
            "path=append_free",
        );
        self.record_allocator_stats("free");
        Ok(())
    }

    /// Sorts the free list by address and merges adjacent entries.
    ///
    /// Returns the number of merges performed. The allocated list is never
    /// touched.
    pub fn defrag(&mut self) -> usize {
        let before = self.free.len();
        if before <= 1 {
            self.record_lifecycle(
                AllocatorLogLevel::Trace,
                "defrag",
                "defrag",
                None,
                None,
                "noop",
                format!("free_regions={}", before),
            );
            return 0;
        }

        self.free.sort_by_start();
        let merged = match coalesce_sorted(&mut self.free) {
            Ok(merged) => merged,
            Err(err) => {
                self.record_lifecycle(
                    AllocatorLogLevel::Error,
                    "defrag",
                    "invariant_free_list_handle",
                    None,
                    None,
                    "aborted",
                    err.to_string(),
                );
                before - self.free.len()
            }
        };

        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "defrag",
            "defrag",
            None,
            None,
            "success",
            format!("merged={} before={} after={}", merged, before, self.free.len()),
        );
        self.record_allocator_stats("defrag");
        merged
    }

    /// Size of the simulated address space.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// How `free` treats addresses with no allocated region.
    pub fn free_mode(&self) -> FreeMode {
        self.free_mode
    }

    /// Regions currently handed out, in allocation order.
    pub fn allocated_list(&self) -> &RegionList {
        &self.allocated
    }

    /// Regions currently free, in list order.
    pub fn free_list(&self) -> &RegionList {
        &self.free
    }

    /// Total number of allocated addresses.
    pub fn allocated_total(&self) -> usize {
        self.allocated_total
    }

    /// Total number of free addresses.
    pub fn free_total(&self) -> usize {
        self.max_size.saturating_sub(self.allocated_total)
    }

    /// Length of the largest free region.
    pub fn largest_free(&self) -> Option<usize> {
        self.free.iter().map(|r| r.length).max()
    }

    /// True when enough addresses are free in total but no single free
    /// region can hold `length`.
    pub fn is_fragmented_for(&self, length: usize) -> bool {
        self.free_total() >= length && self.largest_free().is_none_or(|largest| largest < length)
    }

    /// Verifies that both lists together cover `[0, max_size)` exactly once.
    pub fn check_partition(&self) -> Result<(), InvariantViolation> {
        let mut regions: Vec<Region> = self
            .allocated
            .iter()
            .chain(self.free.iter())
            .copied()
            .collect();
        for region in &regions {
            if region.length == 0 {
                return Err(InvariantViolation::EmptyRegion(*region));
            }
            if region
                .start
                .checked_add(region.length)
                .is_none_or(|end| end > self.max_size)
            {
                return Err(InvariantViolation::OutOfRange {
                    region: *region,
                    max_size: self.max_size,
                });
            }
        }

        regions.sort_by_key(|r| r.start);
        let mut covered = 0;
        let mut previous: Option<Region> = None;
        for region in regions {
            if let Some(previous) = previous
                && previous.overlaps(&region)
            {
                return Err(InvariantViolation::Overlap(previous, region));
            }
            if region.start > covered {
                return Err(InvariantViolation::Gap {
                    start: covered,
                    end: region.start,
                });
            }
            covered = region.end();
            previous = Some(region);
        }
        if covered < self.max_size {
            return Err(InvariantViolation::Gap {
                start: covered,
                end: self.max_size,
            });
        }
        Ok(())
    }

    /// Copies both lists out in their current order.
    pub fn snapshot(&self) -> SpaceSnapshot {
        SpaceSnapshot {
            max_size: self.max_size,
            free: self.free.to_vec(),
            allocated: self.allocated.to_vec(),
        }
    }

    /// Returns a view of retained allocator lifecycle log records.
    pub fn lifecycle_logs(&self) -> &VecDeque<AllocatorLogRecord> {
        &self.lifecycle_logs
    }

    /// Drains allocator lifecycle log records, oldest first.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<AllocatorLogRecord> {
        self.lifecycle_logs.drain(..).collect()
    }
}

/// Merges address-adjacent neighbours of an address-sorted list in one
/// forward pass. After a merge the cursor stays put and is compared against
/// its new successor.
fn coalesce_sorted(list: &mut RegionList) -> Result<usize, ListError> {
    let mut merged = 0;
    let mut cursor = list.first();
    while let Some(current) = cursor {
        let Some(next) = list.next_handle(current)? else {
            break;
        };
        let (head, tail) = (list.region(current)?, list.region(next)?);
        if head.is_adjacent_to(&tail) {
            list.replace(current, Region::new(head.start, head.length + tail.length))?;
            list.remove_handle(next)?;
            merged += 1;
        } else {
            cursor = Some(next);
        }
    }
    Ok(merged)
}

/// Free list on the first line, allocated list on the second.
impl fmt::Display for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.free)?;
        write!(f, "{}", self.allocated)
    }
}
