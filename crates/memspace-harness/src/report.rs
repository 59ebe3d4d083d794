//! Report generation for scenario runs.

use serde::{Deserialize, Serialize};

use crate::runner::CaseResult;

/// Results of one fixture file, ready to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Report title.
    pub title: String,
    /// Free mode the cases ran under.
    pub free_mode: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

impl ScenarioReport {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        free_mode: impl Into<String>,
        timestamp: impl Into<String>,
        results: Vec<CaseResult>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            title: title.into(),
            free_mode: free_mode.into(),
            timestamp: timestamp.into(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    /// True when every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Free mode: {}\n", self.free_mode));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.total));
        out.push_str(&format!("- Passed: {}\n", self.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.failed));

        out.push_str("| Case | Free regions | Allocated regions | Status |\n");
        out.push_str("|------|--------------|-------------------|--------|\n");
        for r in &self.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            let (free, allocated) = r
                .final_snapshot
                .as_ref()
                .map_or((0, 0), |s| (s.free.len(), s.allocated.len()));
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.name, free, allocated, status
            ));
        }

        let failing: Vec<&CaseResult> = self.results.iter().filter(|r| !r.passed).collect();
        if !failing.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failing {
                out.push_str(&format!("\n### {}\n\n", r.name));
                for failure in &r.failures {
                    out.push_str(&format!("- {failure}\n"));
                }
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
