// src/pipeline/outputs.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Outputs recorded for one completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutputs {
    /// Primary output of a singleton stage.
    Single(PathBuf),
    /// Primary outputs of a fan-out stage, indexed by batch.
    Batched(Vec<PathBuf>),
}

/// Recorded outputs of every completed stage, keyed by stage name.
///
/// Consumers declare which producer stages they read and resolve paths here
/// instead of re-deriving file names by string formatting, so a renamed
/// stage fails loudly at lookup rather than silently reading a stale path.
#[derive(Debug, Default)]
pub struct OutputLedger {
    stages: HashMap<String, StageOutputs>,
}

impl OutputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.stages.contains_key(stage)
    }

    pub fn record(&mut self, stage: impl Into<String>, outputs: StageOutputs) {
        self.stages.insert(stage.into(), outputs);
    }

    /// Primary output of a completed singleton stage.
    pub fn single(&self, stage: &str) -> Result<&Path> {
        match self.stages.get(stage) {
            Some(StageOutputs::Single(path)) => Ok(path),
            Some(StageOutputs::Batched(_)) => Err(PipelineError::Configuration(format!(
                "stage '{stage}' produced batched outputs, not a single file"
            ))),
            None => Err(Self::unknown(stage)),
        }
    }

    /// Output of one member of a completed fan-out stage.
    pub fn batch(&self, stage: &str, batch_index: u32) -> Result<&Path> {
        match self.stages.get(stage) {
            Some(StageOutputs::Batched(paths)) => paths
                .get(batch_index as usize)
                .map(PathBuf::as_path)
                .ok_or_else(|| {
                    PipelineError::Configuration(format!(
                        "stage '{stage}' has no batch {batch_index} (width {})",
                        paths.len()
                    ))
                }),
            Some(StageOutputs::Single(_)) => Err(PipelineError::Configuration(format!(
                "stage '{stage}' produced a single output, not batches"
            ))),
            None => Err(Self::unknown(stage)),
        }
    }

    /// All member outputs of a completed fan-out stage, in batch order.
    pub fn batched(&self, stage: &str) -> Result<&[PathBuf]> {
        match self.stages.get(stage) {
            Some(StageOutputs::Batched(paths)) => Ok(paths.as_slice()),
            Some(StageOutputs::Single(_)) => Err(PipelineError::Configuration(format!(
                "stage '{stage}' produced a single output, not batches"
            ))),
            None => Err(Self::unknown(stage)),
        }
    }

    fn unknown(stage: &str) -> PipelineError {
        PipelineError::Configuration(format!("no recorded outputs for stage '{stage}'"))
    }
}
