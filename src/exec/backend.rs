// src/exec/backend.rs

use async_trait::async_trait;

use crate::errors::Result;
use crate::task::TaskSpec;

/// Opaque identifier for a submitted task, issued by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub u64);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Task state as reported by a backend.
///
/// `Exited(0)` is necessary but not sufficient for task success: the core
/// additionally verifies declared outputs, which backends do not check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    Queued,
    Running,
    Exited(i32),
    Error(String),
}

/// Contract between the orchestration core and a batch-computing backend.
///
/// The core never blocks on a running task; it re-polls handles at its own
/// cadence and the poll boundaries are its only suspension points.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Submit a task for execution.
    async fn submit(&self, spec: &TaskSpec) -> Result<JobHandle>;

    /// Report the current state of a previously submitted task.
    async fn poll(&self, handle: &JobHandle) -> Result<BackendState>;

    /// Best-effort request to stop a task.
    async fn cancel(&self, handle: &JobHandle) -> Result<()>;
}
