// src/layout.rs

//! Canonical directory and file addressing for one experiment.
//!
//! Every stage writes into a directory derived from the experiment root and
//! the stage name, and every primary output file mirrors its directory name.
//! Producers compute these paths when declaring outputs and the pipeline
//! records them in the output ledger, so downstream consumers never have to
//! re-derive a path by hand.

use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Highest fan-out width representable by the fixed 3-digit batch labels.
///
/// Anything wider would produce colliding directory names, so batch
/// addressing and group construction reject indices at or beyond this bound.
pub const MAX_BATCHES: u32 = 1000;

/// Path scheme rooted at one experiment's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentLayout {
    root: PathBuf,
}

impl ExperimentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fixed-width label for one member of a fan-out stage, e.g.
    /// `spot_count_007`.
    pub fn batch_label(stage: &str, batch_index: u32) -> Result<String> {
        if batch_index >= MAX_BATCHES {
            return Err(PipelineError::Configuration(format!(
                "batch index {batch_index} exceeds the {MAX_BATCHES}-batch addressing limit"
            )));
        }
        Ok(format!("{stage}_{batch_index:03}"))
    }

    /// Output directory of a singleton stage: `{root}/{stage}`.
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.root.join(stage)
    }

    /// Primary output file of a singleton stage: `{root}/{stage}/{stage}.{ext}`.
    pub fn stage_output(&self, stage: &str, ext: &str) -> PathBuf {
        self.stage_dir(stage).join(format!("{stage}.{ext}"))
    }

    /// Output directory of one fan-out member: `{root}/{stage}_{idx:03}`.
    pub fn batch_dir(&self, stage: &str, batch_index: u32) -> Result<PathBuf> {
        Ok(self.root.join(Self::batch_label(stage, batch_index)?))
    }

    /// Primary output file of one fan-out member:
    /// `{root}/{stage}_{idx:03}/{stage}_{idx:03}.{ext}`.
    pub fn batch_output(&self, stage: &str, batch_index: u32, ext: &str) -> Result<PathBuf> {
        let label = Self::batch_label(stage, batch_index)?;
        Ok(self.root.join(&label).join(format!("{label}.{ext}")))
    }
}
