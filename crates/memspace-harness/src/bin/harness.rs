//! CLI entrypoint for the memspace harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use memspace_core::{Allocator, AllocatorConfig, FreeMode};
use memspace_harness::structured_log::{LogEmitter, LogSink, now_utc};
use memspace_harness::workload::parse_seed;
use memspace_harness::{
    ScenarioReport, ScenarioRunner, ScenarioSet, WorkloadConfig, fixtures, run_workload,
};

/// Scenario and workload tooling for memspace.
#[derive(Debug, Parser)]
#[command(name = "memspace-harness")]
#[command(about = "Scenario runner and workload simulator for the memspace allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay scenario fixtures and verify their expectations.
    Run {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// Force every case into this free mode (parity or strict).
        #[arg(long)]
        free_mode: Option<String>,
        /// Write structured JSONL logs here.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Write a markdown report here.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write a JSON report covering every fixture here.
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
    /// Run a seeded random malloc/free/defrag workload.
    Simulate {
        /// Seed, decimal or 0x-prefixed hex.
        #[arg(long, default_value = "1")]
        seed: String,
        #[arg(long, default_value_t = 10_000)]
        steps: usize,
        #[arg(long, default_value_t = 4096)]
        max_size: usize,
        /// Largest request length (defaults to max_size / 8).
        #[arg(long)]
        max_request: Option<usize>,
        /// Free mode (parity or strict); falls back to MEMSPACE_FREE_MODE.
        #[arg(long)]
        free_mode: Option<String>,
        /// Write structured JSONL logs here.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Print the size-100 split, exact-fit and merge walkthrough.
    ReplayScenario {
        #[arg(long, default_value_t = 100)]
        max_size: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            fixture,
            free_mode,
            log,
            report,
            report_json,
        } => {
            let mut runner = ScenarioRunner::new("run");
            if let Some(mode) = free_mode.as_deref() {
                runner = runner.with_free_mode(FreeMode::from_str_loose(mode));
            }
            let mode_label = runner.free_mode.map_or("per-case", FreeMode::as_str);

            let mut emitter = log
                .as_deref()
                .map(|path| LogEmitter::to_file(path, &format!("run-{}", std::process::id())))
                .transpose()?;

            let mut markdown = String::new();
            let mut all_results = Vec::new();
            for path in fixtures::fixture_paths(&fixture)? {
                let set = ScenarioSet::from_file(&path)?;
                let sink = emitter.as_mut().map(|e| e as &mut dyn LogSink);
                let results = runner.run(&set, sink)?;
                let scenario_report = ScenarioReport::new(
                    format!("{} ({})", set.name, display_name(&path)),
                    mode_label,
                    now_utc(),
                    results,
                );
                for result in &scenario_report.results {
                    let status = if result.passed { "PASS" } else { "FAIL" };
                    println!("{status} {}", result.name);
                    for failure in &result.failures {
                        println!("    {failure}");
                    }
                }
                markdown.push_str(&scenario_report.to_markdown());
                markdown.push('\n');
                all_results.extend(scenario_report.results);
            }
            let combined = ScenarioReport::new(
                format!("memspace scenarios ({})", fixture.display()),
                mode_label,
                now_utc(),
                all_results,
            );

            if let Some(emitter) = emitter.as_mut() {
                emitter.flush()?;
            }
            if let Some(report) = report {
                std::fs::write(&report, markdown)?;
                eprintln!("Report written to {}", report.display());
            }
            if let Some(report_json) = report_json {
                std::fs::write(&report_json, combined.to_json())?;
                eprintln!("JSON report written to {}", report_json.display());
            }
            if !combined.all_passed() {
                return Err(format!("{} scenario case(s) failed", combined.failed).into());
            }
        }
        Command::Simulate {
            seed,
            steps,
            max_size,
            max_request,
            free_mode,
            log,
        } => {
            let mut config = WorkloadConfig::new(parse_seed(&seed)?, steps, max_size);
            if let Some(max_request) = max_request {
                config.max_request = max_request;
            }
            config.free_mode = free_mode
                .as_deref()
                .map_or_else(FreeMode::from_env, FreeMode::from_str_loose);

            let mut emitter = log
                .as_deref()
                .map(|path| LogEmitter::to_file(path, &format!("sim-{:#x}", config.seed)))
                .transpose()?;
            let sink = emitter.as_mut().map(|e| e as &mut dyn LogSink);
            let summary = run_workload(&config, sink)?;
            if let Some(emitter) = emitter.as_mut() {
                emitter.flush()?;
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ReplayScenario { max_size } => {
            replay_scenario(max_size)?;
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Allocates a fifth then the rest, frees both, and defrags, dumping the
/// free and allocated lists after each call.
fn replay_scenario(max_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut space = Allocator::with_config(AllocatorConfig::new(max_size))?;
    println!("new({max_size})\n{space}\n");

    let first_len = (max_size / 5).max(1);
    let first = space.malloc(first_len)?;
    println!("malloc({first_len}) -> {first:?}\n{space}\n");

    let rest_len = max_size.saturating_sub(first_len);
    let rest = if rest_len > 0 {
        let rest = space.malloc(rest_len)?;
        println!("malloc({rest_len}) -> {rest:?}\n{space}\n");
        rest
    } else {
        None
    };

    for address in [first, rest].into_iter().flatten() {
        space.free(address)?;
        println!("free({address})\n{space}\n");
    }

    let merged = space.defrag();
    println!("defrag() -> {merged} merge(s)\n{space}");
    Ok(())
}
