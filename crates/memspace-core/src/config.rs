//! Allocator configuration.
//!
//! The free mode can be chosen per allocator or read from the
//! `MEMSPACE_FREE_MODE` environment variable:
//! - `parity` (default): freeing an address that no allocated region starts
//!   at is a silent no-op.
//! - `strict`: the same call fails with
//!   [`AllocatorError::UnknownAddress`](crate::error::AllocatorError::UnknownAddress).

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`FreeMode::from_env`].
pub const FREE_MODE_ENV: &str = "MEMSPACE_FREE_MODE";

/// How `free` treats an address with no matching allocated region.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreeMode {
    /// Unknown addresses are ignored.
    #[default]
    Parity,
    /// Unknown addresses are reported as errors.
    Strict,
}

impl FreeMode {
    /// Parse from string (case-insensitive). Unrecognised input is `Parity`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "checked" => Self::Strict,
            _ => Self::Parity,
        }
    }

    /// Reads [`FREE_MODE_ENV`], falling back to `Parity` when unset.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(FREE_MODE_ENV)
            .map(|v| Self::from_str_loose(&v))
            .unwrap_or_default()
    }

    /// Returns true if unknown addresses should be reported.
    #[must_use]
    pub const fn rejects_unknown(self) -> bool {
        matches!(self, Self::Strict)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parity => "parity",
            Self::Strict => "strict",
        }
    }
}

/// Construction parameters for an [`Allocator`](crate::malloc::Allocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Size of the simulated address space.
    pub max_size: usize,
    #[serde(default)]
    pub free_mode: FreeMode,
}

impl AllocatorConfig {
    #[must_use]
    pub const fn new(max_size: usize) -> Self {
        Self {
            max_size,
            free_mode: FreeMode::Parity,
        }
    }

    #[must_use]
    pub const fn with_free_mode(mut self, free_mode: FreeMode) -> Self {
        self.free_mode = free_mode;
        self
    }
}
