// src/task/group.rs

use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::ExecutionEngine;
use crate::layout::MAX_BATCHES;
use crate::task::{Task, TaskState};

/// A collection of sibling tasks, one per batch index.
///
/// Members are stored in batch-index order so downstream fan-in stages can
/// address results positionally. Aggregate failure is fail-fast: one failed
/// member marks the whole group failed, with no notion of partial success.
#[derive(Debug)]
pub struct ParallelTaskGroup {
    name: String,
    members: Vec<Task>,
}

impl ParallelTaskGroup {
    /// Fan a per-batch task constructor over `0..n_batches`.
    ///
    /// The constructor must stamp each task with the batch index it was
    /// called for; that is the addressing contract downstream stages rely
    /// on, so it is checked here rather than trusted.
    pub fn build<F>(name: impl Into<String>, n_batches: u32, ctor: F) -> Result<Self>
    where
        F: Fn(u32) -> Result<Task>,
    {
        let name = name.into();
        if n_batches == 0 {
            return Err(PipelineError::Configuration(format!(
                "group '{name}': n_batches must be at least 1"
            )));
        }
        if n_batches > MAX_BATCHES {
            return Err(PipelineError::Configuration(format!(
                "group '{name}': n_batches {n_batches} exceeds the addressing limit of {MAX_BATCHES}"
            )));
        }

        let mut members = Vec::with_capacity(n_batches as usize);
        for batch_index in 0..n_batches {
            let task = ctor(batch_index)?;
            if task.batch_index() != Some(batch_index) {
                return Err(PipelineError::Configuration(format!(
                    "group '{name}': constructor returned batch index {:?} for slot {batch_index}",
                    task.batch_index()
                )));
            }
            members.push(task);
        }

        Ok(Self { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Task] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Submit every member. Members are mutually independent and may run
    /// fully concurrently; a rejected member is recorded `Failed` on the
    /// spot and the remaining members are still submitted.
    pub async fn submit_all(&mut self, engine: &dyn ExecutionEngine) {
        for task in &mut self.members {
            if task.submit(engine).await.is_err() {
                debug!(group = %self.name, task = %task.name(), "member failed at submission");
            }
        }
    }

    /// Poll every non-terminal member and return the aggregate state.
    pub async fn poll_all(&mut self, engine: &dyn ExecutionEngine) -> TaskState {
        for task in &mut self.members {
            task.poll(engine).await;
        }
        self.aggregate_state()
    }

    /// Pure aggregation over member states: `Failed` dominates regardless of
    /// the other members, `Succeeded` requires unanimity.
    pub fn aggregate_state(&self) -> TaskState {
        if self.members.iter().any(|t| t.state() == TaskState::Failed) {
            return TaskState::Failed;
        }
        if self.members.iter().all(|t| t.state() == TaskState::Succeeded) {
            return TaskState::Succeeded;
        }
        if self
            .members
            .iter()
            .any(|t| matches!(t.state(), TaskState::Running | TaskState::Succeeded))
        {
            return TaskState::Running;
        }
        if self.members.iter().any(|t| t.state() == TaskState::Submitted) {
            return TaskState::Submitted;
        }
        TaskState::Created
    }

    /// Best-effort cancellation of every member that has not reached a
    /// terminal state. Already-completed members keep their results.
    pub async fn cancel_non_terminal(&mut self, engine: &dyn ExecutionEngine) {
        for task in &mut self.members {
            if !task.state().is_terminal() {
                warn!(group = %self.name, task = %task.name(), "cancelling member");
                task.cancel(engine).await;
            }
        }
    }

    /// Members that ended `Failed`, for diagnostics.
    pub fn failed_members(&self) -> impl Iterator<Item = &Task> {
        self.members
            .iter()
            .filter(|t| t.state() == TaskState::Failed)
    }
}
