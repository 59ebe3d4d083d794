//! Harness error type.

use std::path::PathBuf;

use memspace_core::{AllocatorError, InvariantViolation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("allocator: {0}")]
    Allocator(#[from] AllocatorError),
    #[error("step {step}: {violation}")]
    Invariant {
        step: usize,
        violation: InvariantViolation,
    },
    #[error("step {step}: free list not address-sorted after defrag")]
    DefragUnsorted { step: usize },
    #[error("step {step}: second defrag changed the free list")]
    DefragNotIdempotent { step: usize },
    #[error("invalid seed {0:?} (expected decimal or 0x-prefixed hex)")]
    InvalidSeed(String),
    #[error("no scenario fixtures found in {}", .0.display())]
    NoFixtures(PathBuf),
}
