//! Scenario execution engine.

use memspace_core::{
    Allocator, AllocatorConfig, AllocatorError, FreeMode, Region, SpaceSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::fixtures::{ScenarioCase, ScenarioSet, Step};
use crate::structured_log::{LogEntry, LogLevel, LogSink};

/// Outcome of replaying one [`ScenarioCase`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub passed: bool,
    /// One line per failed expectation, prefixed with the step index.
    pub failures: Vec<String>,
    /// Allocator state after the last step, if construction succeeded.
    pub final_snapshot: Option<SpaceSnapshot>,
}

/// Replays scenario sets against fresh allocators.
pub struct ScenarioRunner {
    /// Name of the run, used in log entries.
    pub campaign: String,
    /// Forces every case into this free mode when set.
    pub free_mode: Option<FreeMode>,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            free_mode: None,
        }
    }

    #[must_use]
    pub fn with_free_mode(mut self, free_mode: FreeMode) -> Self {
        self.free_mode = Some(free_mode);
        self
    }

    /// Run every case in `set`.
    pub fn run(
        &self,
        set: &ScenarioSet,
        mut sink: Option<&mut dyn LogSink>,
    ) -> std::io::Result<Vec<CaseResult>> {
        let mut results = Vec::with_capacity(set.cases.len());
        for case in &set.cases {
            results.push(self.run_case(case, sink.as_mut().map(|s| &mut **s as &mut dyn LogSink))?);
        }
        Ok(results)
    }

    /// Run a single case. Only sink write failures are returned as errors;
    /// allocator misbehaviour is recorded in the result.
    pub fn run_case(
        &self,
        case: &ScenarioCase,
        mut sink: Option<&mut dyn LogSink>,
    ) -> std::io::Result<CaseResult> {
        let free_mode = self.free_mode.unwrap_or(case.free_mode);
        let config = AllocatorConfig::new(case.max_size).with_free_mode(free_mode);

        if let Some(sink) = sink.as_deref_mut() {
            sink.emit_entry(
                LogEntry::new("", LogLevel::Info, "case_start")
                    .with_scenario(case.name.clone(), None)
                    .with_details(serde_json::json!({
                        "campaign": self.campaign,
                        "max_size": case.max_size,
                        "free_mode": free_mode.as_str(),
                    })),
            )?;
        }

        let mut space = match Allocator::with_config(config) {
            Ok(space) => space,
            Err(err) => {
                return Ok(CaseResult {
                    name: case.name.clone(),
                    passed: false,
                    failures: vec![format!("construction failed: {err}")],
                    final_snapshot: None,
                });
            }
        };

        let mut failures = Vec::new();
        for (index, step) in case.steps.iter().enumerate() {
            if let Some(failure) = apply_step(&mut space, step) {
                failures.push(format!("step {index}: {failure}"));
            }
            if let Some(sink) = sink.as_deref_mut() {
                for record in space.drain_lifecycle_logs() {
                    sink.emit_entry(
                        LogEntry::from_allocator_record(&record)
                            .with_scenario(case.name.clone(), Some(index)),
                    )?;
                }
            }
            if let Err(violation) = space.check_partition() {
                failures.push(format!("step {index}: {violation}"));
                break;
            }
        }

        let passed = failures.is_empty();
        if let Some(sink) = sink {
            let level = if passed { LogLevel::Info } else { LogLevel::Error };
            sink.emit_entry(
                LogEntry::new("", level, "case_end")
                    .with_scenario(case.name.clone(), None)
                    .with_outcome(if passed { "pass" } else { "fail" })
                    .with_details(serde_json::json!({ "failures": failures.len() })),
            )?;
        }

        Ok(CaseResult {
            name: case.name.clone(),
            passed,
            failures,
            final_snapshot: Some(space.snapshot()),
        })
    }
}

/// Stable label for an allocator error, as used by fixture expectations.
#[must_use]
pub fn error_kind(err: &AllocatorError) -> &'static str {
    match err {
        AllocatorError::EmptyAllocation => "empty_allocation",
        AllocatorError::ZeroLength => "zero_length",
        AllocatorError::ZeroCapacity => "zero_capacity",
        AllocatorError::UnknownAddress(_) => "unknown_address",
        AllocatorError::List(_) => "list",
    }
}

/// Applies one step, returning a description of any unmet expectation.
fn apply_step(space: &mut Allocator, step: &Step) -> Option<String> {
    match step {
        Step::Malloc {
            length,
            expect_address,
            expect_failure,
            expect_error,
        } => match (space.malloc(*length), expect_error) {
            (Err(err), Some(kind)) if error_kind(&err) == kind.as_str() => None,
            (Err(err), _) => Some(format!("malloc({length}) failed: {err}")),
            (Ok(_), Some(kind)) => Some(format!("malloc({length}) expected {kind} error")),
            (Ok(None), None) if *expect_failure || expect_address.is_none() => None,
            (Ok(None), None) => Some(format!("malloc({length}) found no fit")),
            (Ok(Some(address)), None) if *expect_failure => {
                Some(format!("malloc({length}) expected failure, got {address}"))
            }
            (Ok(Some(address)), None) => match expect_address {
                Some(expected) if *expected != address => Some(format!(
                    "malloc({length}) returned {address}, expected {expected}"
                )),
                _ => None,
            },
        },
        Step::Free {
            address,
            expect_error,
        } => match (space.free(*address), expect_error) {
            (Ok(()), None) => None,
            (Ok(()), Some(kind)) => Some(format!("free({address}) expected {kind} error")),
            (Err(err), Some(kind)) if error_kind(&err) == kind.as_str() => None,
            (Err(err), _) => Some(format!("free({address}) failed: {err}")),
        },
        Step::Defrag => {
            space.defrag();
            None
        }
        Step::ExpectFree { regions } => {
            compare_regions("free", &space.free_list().to_vec(), regions)
        }
        Step::ExpectAllocated { regions } => {
            compare_regions("allocated", &space.allocated_list().to_vec(), regions)
        }
    }
}

fn compare_regions(which: &str, actual: &[Region], expected: &[Region]) -> Option<String> {
    if actual == expected {
        return None;
    }
    let render = |regions: &[Region]| {
        regions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    Some(format!(
        "{which} list mismatch: expected [{}], got [{}]",
        render(expected),
        render(actual)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured_log::{LogEmitter, validate_log_line};

    fn case(max_size: usize, steps: Vec<Step>) -> ScenarioCase {
        ScenarioCase {
            name: "case".to_string(),
            max_size,
            free_mode: FreeMode::Parity,
            steps,
        }
    }

    fn malloc(length: usize, expect_address: Option<usize>) -> Step {
        Step::Malloc {
            length,
            expect_address,
            expect_failure: false,
            expect_error: None,
        }
    }

    #[test]
    fn passing_case_reports_final_snapshot() {
        let runner = ScenarioRunner::new("unit");
        let result = runner
            .run_case(
                &case(
                    100,
                    vec![
                        malloc(20, Some(0)),
                        Step::ExpectFree {
                            regions: vec![Region::new(20, 80)],
                        },
                    ],
                ),
                None,
            )
            .unwrap();
        assert!(result.passed, "{:?}", result.failures);
        let snapshot = result.final_snapshot.unwrap();
        assert_eq!(snapshot.allocated, vec![Region::new(0, 20)]);
    }

    #[test]
    fn mismatched_address_is_a_failure() {
        let runner = ScenarioRunner::new("unit");
        let result = runner
            .run_case(&case(100, vec![malloc(20, Some(5))]), None)
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].starts_with("step 0:"));
    }

    #[test]
    fn expected_errors_match_by_kind() {
        let runner = ScenarioRunner::new("unit");
        let steps = vec![
            Step::Malloc {
                length: 0,
                expect_address: None,
                expect_failure: false,
                expect_error: Some("zero_length".to_string()),
            },
            Step::Free {
                address: 0,
                expect_error: Some("empty_allocation".to_string()),
            },
        ];
        let result = runner.run_case(&case(10, steps), None).unwrap();
        assert!(result.passed, "{:?}", result.failures);
    }

    #[test]
    fn free_mode_override_applies_to_every_case() {
        let steps = vec![
            malloc(4, Some(0)),
            Step::Free {
                address: 7,
                expect_error: Some("unknown_address".to_string()),
            },
        ];
        let parity = ScenarioRunner::new("unit")
            .run_case(&case(10, steps.clone()), None)
            .unwrap();
        assert!(!parity.passed);

        let strict = ScenarioRunner::new("unit")
            .with_free_mode(FreeMode::Strict)
            .run_case(&case(10, steps), None)
            .unwrap();
        assert!(strict.passed, "{:?}", strict.failures);
    }

    #[test]
    fn zero_capacity_case_fails_without_snapshot() {
        let result = ScenarioRunner::new("unit")
            .run_case(&case(0, Vec::new()), None)
            .unwrap();
        assert!(!result.passed);
        assert!(result.final_snapshot.is_none());
    }

    #[test]
    fn lifecycle_records_are_forwarded_to_sink() {
        let mut emitter = LogEmitter::to_buffer("run-unit");
        let set = ScenarioSet {
            version: "v1".to_string(),
            name: "logs".to_string(),
            cases: vec![case(32, vec![malloc(8, Some(0)), Step::Defrag])],
        };
        let results = ScenarioRunner::new("unit")
            .run(&set, Some(&mut emitter))
            .unwrap();
        assert!(results[0].passed);

        let text = String::from_utf8(emitter.into_inner()).unwrap();
        let entries: Vec<LogEntry> = text
            .lines()
            .enumerate()
            .map(|(i, line)| validate_log_line(line, i + 1).unwrap())
            .collect();
        assert_eq!(entries.first().unwrap().event, "case_start");
        assert_eq!(entries.last().unwrap().event, "case_end");
        assert!(
            entries
                .iter()
                .any(|e| e.symbol.as_deref() == Some("malloc") && e.step == Some(0))
        );
        assert!(
            entries
                .iter()
                .any(|e| e.symbol.as_deref() == Some("defrag") && e.step == Some(1))
        );
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(error_kind(&AllocatorError::ZeroLength), "zero_length");
        assert_eq!(
            error_kind(&AllocatorError::UnknownAddress(3)),
            "unknown_address"
        );
    }
}
