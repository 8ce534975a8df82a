// src/pipeline/status.rs

//! Serializable snapshots of pipeline, stage and member state, used for
//! logging and the on-disk session report.

use serde::Serialize;

use crate::pipeline::staged::PipelineState;
use crate::task::{Task, TaskState};

/// Observed state of one task within a stage.
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
    pub name: String,
    pub batch_index: Option<u32>,
    pub state: TaskState,
    pub error: Option<String>,
}

impl MemberStatus {
    pub fn of(task: &Task) -> Self {
        Self {
            name: task.name().to_string(),
            batch_index: task.batch_index(),
            state: task.state(),
            error: task.error().map(|e| e.to_string()),
        }
    }
}

/// Final or in-flight state of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageStatus {
    pub name: String,
    pub state: TaskState,
    pub members: Vec<MemberStatus>,
}

/// Snapshot of a whole pipeline: past stages plus the active one.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub pipeline: String,
    pub state: PipelineState,
    pub current_stage: Option<String>,
    pub stages: Vec<StageStatus>,
    pub error: Option<String>,
}
