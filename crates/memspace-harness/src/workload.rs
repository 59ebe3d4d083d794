//! Seeded random workloads.
//!
//! A workload interleaves `malloc`, `free` of a live block, and `defrag`
//! using a xorshift generator, checking the partition invariant after every
//! step, that `defrag` leaves the free list address-sorted, and that a second
//! `defrag` never changes it.

use memspace_core::{Allocator, AllocatorConfig, FreeMode};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::structured_log::{LogEntry, LogLevel, LogSink};

/// Deterministic xorshift64* generator.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// A zero seed would stick at zero, so it is remapped.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `low..=high`.
    pub fn range(&mut self, low: usize, high: usize) -> usize {
        debug_assert!(low <= high);
        let span = (high - low) as u64 + 1;
        low + (self.next_u64() % span) as usize
    }
}

/// Parameters for [`run_workload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub seed: u64,
    pub steps: usize,
    pub max_size: usize,
    /// Largest request length; requests are drawn from `1..=max_request`.
    pub max_request: usize,
    #[serde(default)]
    pub free_mode: FreeMode,
}

impl WorkloadConfig {
    #[must_use]
    pub fn new(seed: u64, steps: usize, max_size: usize) -> Self {
        Self {
            seed,
            steps,
            max_size,
            max_request: (max_size / 8).max(1),
            free_mode: FreeMode::Parity,
        }
    }
}

/// Counters collected over a workload run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSummary {
    pub seed: u64,
    pub steps: usize,
    pub mallocs: usize,
    /// `malloc` calls answered with the failure sentinel.
    pub malloc_failures: usize,
    /// Failures where total free space would have sufficed.
    pub fragmented_failures: usize,
    pub frees: usize,
    pub defrags: usize,
    pub merges: usize,
    pub final_allocated: usize,
    pub final_free_regions: usize,
    pub final_free_total: usize,
}

/// Runs a seeded workload, stopping at the first invariant breach.
pub fn run_workload(
    config: &WorkloadConfig,
    mut sink: Option<&mut dyn LogSink>,
) -> Result<WorkloadSummary, HarnessError> {
    let mut space =
        Allocator::with_config(AllocatorConfig::new(config.max_size).with_free_mode(config.free_mode))?;
    let mut rng = XorShift64::new(config.seed);
    let mut live: Vec<usize> = Vec::new();
    let max_request = config.max_request.max(1);
    let scenario = format!("workload-{:#x}", config.seed);
    let mut summary = WorkloadSummary {
        seed: config.seed,
        steps: config.steps,
        ..WorkloadSummary::default()
    };

    for step in 0..config.steps {
        match rng.range(0, 9) {
            0..=4 => {
                let length = rng.range(1, max_request);
                summary.mallocs += 1;
                match space.malloc(length)? {
                    Some(address) => live.push(address),
                    None => {
                        summary.malloc_failures += 1;
                        if space.is_fragmented_for(length) {
                            summary.fragmented_failures += 1;
                        }
                    }
                }
            }
            5..=8 if !live.is_empty() => {
                let index = rng.range(0, live.len() - 1);
                space.free(live.swap_remove(index))?;
                summary.frees += 1;
            }
            _ => {
                summary.merges += space.defrag();
                summary.defrags += 1;
                let once = space.snapshot();
                if once.free != once.free_by_address() {
                    return Err(HarnessError::DefragUnsorted { step });
                }
                space.defrag();
                if space.free_list().to_vec() != once.free {
                    return Err(HarnessError::DefragNotIdempotent { step });
                }
            }
        }

        if let Some(sink) = sink.as_deref_mut() {
            for record in space.drain_lifecycle_logs() {
                sink.emit_entry(
                    LogEntry::from_allocator_record(&record)
                        .with_scenario(scenario.clone(), Some(step)),
                )?;
            }
        } else {
            space.drain_lifecycle_logs();
        }

        space
            .check_partition()
            .map_err(|violation| HarnessError::Invariant { step, violation })?;
    }

    summary.final_allocated = space.allocated_list().len();
    summary.final_free_regions = space.free_list().len();
    summary.final_free_total = space.free_total();

    if let Some(sink) = sink {
        sink.emit_entry(
            LogEntry::new("", LogLevel::Info, "workload_end")
                .with_scenario(scenario, None)
                .with_outcome("pass")
                .with_details(serde_json::to_value(&summary)?),
        )?;
    }
    Ok(summary)
}

/// Parses a seed given as decimal or `0x`-prefixed hex; `_` separators are
/// ignored.
pub fn parse_seed(raw: &str) -> Result<u64, HarnessError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|_| HarnessError::InvalidSeed(raw.to_string()))
}
