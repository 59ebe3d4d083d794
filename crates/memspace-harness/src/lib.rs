//! Scenario and workload harness for memspace.
//!
//! This crate provides:
//! - Scenario fixtures: JSON-described operation sequences with expectations
//! - Scenario runner: replays fixtures against fresh allocators
//! - Workload simulation: seeded random malloc/free/defrag mixes
//! - Structured logging: JSONL records for every allocator decision
//! - Report generation: human-readable + machine-readable run reports

#![forbid(unsafe_code)]

pub mod error;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod workload;

pub use error::HarnessError;
pub use fixtures::{ScenarioCase, ScenarioSet, Step};
pub use report::ScenarioReport;
pub use runner::{CaseResult, ScenarioRunner};
pub use workload::{WorkloadConfig, WorkloadSummary, run_workload};
