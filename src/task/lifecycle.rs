// src/task/lifecycle.rs

use std::fs;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::{BackendState, ExecutionEngine, JobHandle};
use crate::task::TaskSpec;

/// Lifecycle state of a single task.
///
/// Transitions are monotonic: `Created → Submitted → Running → Succeeded |
/// Failed`, with the single shortcut `Created → Failed` when submission-time
/// validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created,
    Submitted,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Created => "created",
            TaskState::Submitted => "submitted",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single schedulable task plus its observed lifecycle.
///
/// Outputs are only considered valid once the state is `Succeeded`, which
/// requires both backend-reported success and every declared output existing
/// non-empty on disk.
#[derive(Debug)]
pub struct Task {
    spec: TaskSpec,
    state: TaskState,
    error: Option<PipelineError>,
    handle: Option<JobHandle>,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            state: TaskState::Created,
            error: None,
            handle: None,
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn batch_index(&self) -> Option<u32> {
        self.spec.batch_index
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The error that terminated this task, if it failed.
    pub fn error(&self) -> Option<&PipelineError> {
        self.error.as_ref()
    }

    /// Check that every declared input exists. Side-effect free.
    pub fn validate_for_submission(&self) -> Result<()> {
        for input in &self.spec.inputs {
            if !input.exists() {
                return Err(PipelineError::MissingInput {
                    path: input.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validate and hand the spec to the engine.
    ///
    /// `Created → Submitted` on acceptance; directly `Created → Failed` when
    /// validation fails or the backend rejects the request.
    pub async fn submit(&mut self, engine: &dyn ExecutionEngine) -> Result<()> {
        if self.state != TaskState::Created {
            return Ok(());
        }

        if let Err(err) = self.validate_for_submission() {
            warn!(task = %self.spec.name, error = %err, "submission validation failed");
            self.fail(err.clone());
            return Err(err);
        }

        match engine.submit(&self.spec).await {
            Ok(handle) => {
                debug!(task = %self.spec.name, handle = %handle, "task submitted");
                self.handle = Some(handle);
                self.state = TaskState::Submitted;
                Ok(())
            }
            Err(err) => {
                warn!(task = %self.spec.name, error = %err, "backend rejected task");
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Query the engine for the current state.
    ///
    /// Idempotent once terminal: no engine call is made and the recorded
    /// state is returned unchanged. Backend-reported success is additionally
    /// gated on every declared output existing non-empty; the backend itself
    /// does not check this.
    pub async fn poll(&mut self, engine: &dyn ExecutionEngine) -> TaskState {
        if self.state.is_terminal() {
            return self.state;
        }
        let Some(handle) = self.handle else {
            return self.state;
        };

        let backend = engine.poll(&handle).await;

        // The backend has started (or already finished) the task; pass
        // through `Running` so no transition skips a state.
        if self.state == TaskState::Submitted
            && !matches!(backend, Ok(BackendState::Queued))
        {
            debug!(task = %self.spec.name, "task running");
            self.state = TaskState::Running;
        }

        match backend {
            Ok(BackendState::Queued) | Ok(BackendState::Running) => {}
            Ok(BackendState::Exited(0)) => match self.verify_outputs() {
                Ok(()) => {
                    info!(task = %self.spec.name, "task succeeded");
                    self.state = TaskState::Succeeded;
                }
                Err(err) => {
                    warn!(
                        task = %self.spec.name,
                        error = %err,
                        "backend reported success but outputs failed verification"
                    );
                    self.fail(err);
                }
            },
            Ok(BackendState::Exited(code)) => {
                warn!(task = %self.spec.name, exit_code = code, "task failed");
                self.fail(PipelineError::Backend(format!("exit code {code}")));
            }
            Ok(BackendState::Error(message)) => {
                warn!(task = %self.spec.name, error = %message, "backend error");
                self.fail(PipelineError::Backend(message));
            }
            Err(err) => {
                warn!(task = %self.spec.name, error = %err, "polling failed");
                self.fail(err);
            }
        }

        self.state
    }

    /// Best-effort cancellation; the task terminates `Failed`/cancelled even
    /// if the backend never acknowledges the request.
    pub async fn cancel(&mut self, engine: &dyn ExecutionEngine) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(handle) = self.handle
            && let Err(err) = engine.cancel(&handle).await
        {
            warn!(task = %self.spec.name, error = %err, "cancel request failed");
        }
        self.fail(PipelineError::Cancelled);
    }

    fn verify_outputs(&self) -> Result<()> {
        for output in &self.spec.outputs {
            let non_empty = fs::metadata(output).map(|m| m.len() > 0).unwrap_or(false);
            if !non_empty {
                return Err(PipelineError::OutputMissing {
                    path: output.clone(),
                });
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: PipelineError) {
        self.error = Some(error);
        self.state = TaskState::Failed;
    }
}
