// src/workflows/mod.rs

//! Concrete experiment pipelines.
//!
//! Each workflow turns an immutable [`ExperimentParams`] into a
//! [`StagedPipeline`] whose stages run the external analysis scripts; the
//! orchestration core stays agnostic of what those scripts compute and only
//! sees their command and file contracts.

pub mod params;
pub mod spot2d;
pub mod spot3d;

pub use params::ExperimentParams;

use std::str::FromStr;

use crate::pipeline::StagedPipeline;

/// Selectable pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    /// Threshold sweep on 2D projections with an aggregate rescaling stage.
    Spot2d,
    /// Threshold sweep on 3D stacks with a final concatenation stage.
    Spot3d,
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spot-2d" | "spot2d" => Ok(WorkflowKind::Spot2d),
            "spot-3d" | "spot3d" => Ok(WorkflowKind::Spot3d),
            other => Err(format!(
                "unknown workflow: {other} (expected \"spot-2d\" or \"spot-3d\")"
            )),
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowKind::Spot2d => "spot-2d",
            WorkflowKind::Spot3d => "spot-3d",
        };
        f.write_str(name)
    }
}

/// Build the pipeline for the selected workflow.
pub fn build(kind: WorkflowKind, params: ExperimentParams) -> StagedPipeline<ExperimentParams> {
    match kind {
        WorkflowKind::Spot2d => spot2d::pipeline(params),
        WorkflowKind::Spot3d => spot3d::pipeline(params),
    }
}
