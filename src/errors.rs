// src/errors.rs

//! Crate-wide error types.
//!
//! Domain failures (validation, submission, backend outcomes, output gating)
//! are expressed as [`PipelineError`]. Application-level plumbing (config
//! loading, report writing) uses `anyhow` with context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that terminate a task, group or pipeline.
///
/// A task that ends `Failed` keeps the error that caused it, so that the
/// failing member stays attributable at the group and pipeline level; hence
/// the variants are cloneable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Bad pipeline or group parameters (e.g. `n_batches == 0`).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declared input path was absent at submission time.
    #[error("declared input missing at submission: {}", .path.display())]
    MissingInput { path: PathBuf },

    /// The execution backend rejected the submission.
    #[error("backend rejected submission: {0}")]
    Submission(String),

    /// The backend reported success but a declared output is absent or empty.
    #[error("declared output missing or empty after backend success: {}", .path.display())]
    OutputMissing { path: PathBuf },

    /// The task was cancelled before reaching a terminal state on its own.
    #[error("cancelled")]
    Cancelled,

    /// Opaque failure surfaced by the execution backend.
    #[error("backend failure: {0}")]
    Backend(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
