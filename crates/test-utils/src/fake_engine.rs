use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use spotpipe::errors::{PipelineError, Result};
use spotpipe::exec::{BackendState, ExecutionEngine, JobHandle};
use spotpipe::task::TaskSpec;

/// Per-task behaviour of the fake engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Exit 0 and create every declared output (default).
    Succeed,
    /// Exit 0 without creating the declared outputs.
    SucceedWithoutOutputs,
    /// Exit with the given non-zero code.
    FailExit(i32),
    /// Stay `Running` forever.
    RunForever,
    /// Reject the submission outright.
    RejectSubmission,
}

struct Inner {
    behaviours: Mutex<HashMap<String, FakeBehaviour>>,
    handles: Mutex<HashMap<u64, String>>,
    submitted: Mutex<Vec<TaskSpec>>,
    cancelled: Mutex<Vec<String>>,
    poll_counts: Mutex<HashMap<String, u64>>,
    next_id: AtomicU64,
}

/// A scripted in-memory engine: records every submission, poll and cancel,
/// and reports per-task outcomes configured ahead of time.
///
/// Clones share state, so a test can keep one handle for assertions while
/// handing another (e.g. boxed) to a runner.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Inner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                behaviours: Mutex::new(HashMap::new()),
                handles: Mutex::new(HashMap::new()),
                submitted: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
                poll_counts: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Configure the behaviour for a task name (default is `Succeed`).
    pub fn behave(&self, task: &str, behaviour: FakeBehaviour) {
        self.inner
            .behaviours
            .lock()
            .unwrap()
            .insert(task.to_string(), behaviour);
    }

    /// Every spec handed to `submit`, in submission order.
    pub fn submitted(&self) -> Vec<TaskSpec> {
        self.inner.submitted.lock().unwrap().clone()
    }

    pub fn submitted_names(&self) -> Vec<String> {
        self.submitted().into_iter().map(|s| s.name).collect()
    }

    /// Task names that received a cancel request.
    pub fn cancelled(&self) -> Vec<String> {
        self.inner.cancelled.lock().unwrap().clone()
    }

    /// How many times the given task has been polled.
    pub fn polls_for(&self, task: &str) -> u64 {
        self.inner
            .poll_counts
            .lock()
            .unwrap()
            .get(task)
            .copied()
            .unwrap_or(0)
    }

    fn behaviour_of(&self, task: &str) -> FakeBehaviour {
        self.inner
            .behaviours
            .lock()
            .unwrap()
            .get(task)
            .copied()
            .unwrap_or(FakeBehaviour::Succeed)
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for FakeEngine {
    async fn submit(&self, spec: &TaskSpec) -> Result<JobHandle> {
        self.inner.submitted.lock().unwrap().push(spec.clone());

        match self.behaviour_of(&spec.name) {
            FakeBehaviour::RejectSubmission => Err(PipelineError::Submission(format!(
                "submission of '{}' rejected",
                spec.name
            ))),
            behaviour => {
                if behaviour == FakeBehaviour::Succeed {
                    // Make the output-existence gate pass.
                    for output in &spec.outputs {
                        if let Some(parent) = output.parent() {
                            let _ = fs::create_dir_all(parent);
                        }
                        let _ = fs::write(output, b"data");
                    }
                }
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .handles
                    .lock()
                    .unwrap()
                    .insert(id, spec.name.clone());
                Ok(JobHandle(id))
            }
        }
    }

    async fn poll(&self, handle: &JobHandle) -> Result<BackendState> {
        let name = self
            .inner
            .handles
            .lock()
            .unwrap()
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| PipelineError::Backend(format!("unknown handle {handle}")))?;

        *self
            .inner
            .poll_counts
            .lock()
            .unwrap()
            .entry(name.clone())
            .or_insert(0) += 1;

        Ok(match self.behaviour_of(&name) {
            FakeBehaviour::Succeed | FakeBehaviour::SucceedWithoutOutputs => BackendState::Exited(0),
            FakeBehaviour::FailExit(code) => BackendState::Exited(code),
            FakeBehaviour::RunForever => BackendState::Running,
            FakeBehaviour::RejectSubmission => BackendState::Error("rejected".to_string()),
        })
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<()> {
        if let Some(name) = self.inner.handles.lock().unwrap().get(&handle.0).cloned() {
            self.inner.cancelled.lock().unwrap().push(name);
        }
        Ok(())
    }
}
