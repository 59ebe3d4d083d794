//! Scenario fixture loading.
//!
//! A fixture file is a JSON [`ScenarioSet`]: named cases, each replaying a
//! list of allocator operations and expectations against a fresh space.

use std::path::{Path, PathBuf};

use memspace_core::{FreeMode, Region};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// One operation or expectation inside a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// `malloc(length)`. With neither expectation set, any outcome passes.
    Malloc {
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_address: Option<usize>,
        /// Expect the failure sentinel.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        expect_failure: bool,
        /// Expect an error of this kind (see [`crate::runner::error_kind`]).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_error: Option<String>,
    },
    /// `free(address)`.
    Free {
        address: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_error: Option<String>,
    },
    /// `defrag()`.
    Defrag,
    /// The free list must equal `regions`, in list order.
    ExpectFree { regions: Vec<Region> },
    /// The allocated list must equal `regions`, in list order.
    ExpectAllocated { regions: Vec<Region> },
}

/// A single scenario replayed against a fresh allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCase {
    /// Case identifier.
    pub name: String,
    /// Size of the simulated address space.
    pub max_size: usize,
    /// Free mode for this case; the runner may override it.
    #[serde(default)]
    pub free_mode: FreeMode,
    pub steps: Vec<Step>,
}

/// A collection of scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    /// Schema version.
    pub version: String,
    /// Collection name.
    pub name: String,
    pub cases: Vec<ScenarioCase>,
}

impl ScenarioSet {
    /// Load a scenario set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a scenario set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}

/// Resolves `path` to a sorted list of fixture files.
///
/// A file is returned as-is; a directory yields its `*.json` entries.
pub fn fixture_paths(path: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(HarnessError::NoFixtures(path.to_path_buf()));
    }
    Ok(paths)
}
