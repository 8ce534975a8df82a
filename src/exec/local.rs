// src/exec/local.rs

use std::collections::HashMap;
use std::fs::{self, File};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::{BackendState, ExecutionEngine, JobHandle};
use crate::task::TaskSpec;

struct LocalJob {
    child: Child,
    exit: Option<i32>,
}

/// Runs tasks as local child processes.
///
/// Each task runs with its output directory as working directory and with
/// stdout/stderr redirected to the declared files, so declared outputs
/// written by relative name land where the layout expects them. Polling is
/// non-blocking: exit status is collected with `try_wait` and cached, so a
/// finished job is never reaped twice.
pub struct LocalEngine {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<u64, LocalJob>>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for LocalEngine {
    async fn submit(&self, spec: &TaskSpec) -> Result<JobHandle> {
        fs::create_dir_all(&spec.output_dir).map_err(|e| {
            PipelineError::Submission(format!(
                "creating output dir {}: {e}",
                spec.output_dir.display()
            ))
        })?;
        let stdout = File::create(spec.output_dir.join(&spec.stdout))
            .map_err(|e| PipelineError::Submission(format!("opening stdout file: {e}")))?;
        let stderr = File::create(spec.output_dir.join(&spec.stderr))
            .map_err(|e| PipelineError::Submission(format!("opening stderr file: {e}")))?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            PipelineError::Submission(format!("spawning '{}': {e}", spec.program))
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(
            task = %spec.name,
            handle = id,
            program = %spec.program,
            memory = %spec.memory,
            "local process started"
        );
        self.jobs.lock().await.insert(id, LocalJob { child, exit: None });
        Ok(JobHandle(id))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<BackendState> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&handle.0)
            .ok_or_else(|| PipelineError::Backend(format!("unknown handle {handle}")))?;

        if let Some(code) = job.exit {
            return Ok(BackendState::Exited(code));
        }

        match job.child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(-1);
                job.exit = Some(code);
                debug!(handle = %handle, exit_code = code, "local process exited");
                Ok(BackendState::Exited(code))
            }
            Ok(None) => Ok(BackendState::Running),
            Err(e) => Ok(BackendState::Error(format!("waiting on process: {e}"))),
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&handle.0)
            && job.exit.is_none()
            && let Err(e) = job.child.start_kill()
        {
            warn!(handle = %handle, error = %e, "kill request failed");
        }
        Ok(())
    }
}
