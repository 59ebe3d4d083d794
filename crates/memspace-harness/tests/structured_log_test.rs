//! Integration test: structured logging contract.
//!
//! Validates that:
//! 1. LogEmitter writes one valid JSONL line per entry to a file.
//! 2. Allocator lifecycle records keep their trace ids and symbols.
//! 3. A seeded workload produces a log where every line validates.
//!
//! Run: cargo test -p memspace-harness --test structured_log_test

use std::path::{Path, PathBuf};

use memspace_core::Allocator;
use memspace_harness::structured_log::{LogEmitter, LogEntry, LogLevel, LogSink, validate_log_line};
use memspace_harness::{WorkloadConfig, run_workload};

fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("memspace-{name}-{}.jsonl", std::process::id()))
}

fn read_entries(path: &Path) -> Vec<LogEntry> {
    let content = std::fs::read_to_string(path).unwrap();
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            validate_log_line(line, i + 1).unwrap_or_else(|errors| {
                panic!("{}", errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))
            })
        })
        .collect()
}

#[test]
fn emitter_writes_jsonl_to_file() {
    let path = temp_log("emitter");
    {
        let mut emitter = LogEmitter::to_file(&path, "file-run").unwrap();
        emitter.emit(LogLevel::Info, "start").unwrap();
        emitter
            .emit_entry(
                LogEntry::new("", LogLevel::Warn, "custom")
                    .with_symbol("free")
                    .with_outcome("ignored"),
            )
            .unwrap();
        emitter.flush().unwrap();
    }

    let entries = read_entries(&path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].trace_id, "file-run::001");
    assert_eq!(entries[1].trace_id, "file-run::002");
    assert_eq!(entries[1].level, LogLevel::Warn);
    assert_eq!(entries[1].outcome.as_deref(), Some("ignored"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn lifecycle_records_keep_trace_ids() {
    let mut space = Allocator::new(64).unwrap();
    let address = space.malloc(16).unwrap().unwrap();
    space.free(address).unwrap();
    space.defrag();

    let records = space.drain_lifecycle_logs();
    let entries: Vec<LogEntry> = records.iter().map(LogEntry::from_allocator_record).collect();
    for (record, entry) in records.iter().zip(&entries) {
        assert_eq!(entry.trace_id, record.trace_id);
        assert_eq!(entry.symbol.as_deref(), Some(record.symbol));
        assert_eq!(entry.details.as_ref().unwrap()["decision_id"], record.decision_id);
    }
    for symbol in ["malloc", "free", "defrag"] {
        assert!(
            entries.iter().any(|e| e.symbol.as_deref() == Some(symbol)),
            "missing {symbol} record"
        );
    }
}

#[test]
fn workload_log_validates_line_by_line() {
    let path = temp_log("workload");
    let summary = {
        let mut emitter = LogEmitter::to_file(&path, "wl").unwrap();
        let summary = run_workload(&WorkloadConfig::new(11, 400, 256), Some(&mut emitter)).unwrap();
        emitter.flush().unwrap();
        summary
    };

    let entries = read_entries(&path);
    let last = entries.last().unwrap();
    assert_eq!(last.event, "workload_end");
    assert_eq!(last.details.as_ref().unwrap()["mallocs"], summary.mallocs);
    assert!(entries.iter().all(|e| e.scenario.as_deref() == Some("workload-0xb")));
    std::fs::remove_file(&path).unwrap();
}
