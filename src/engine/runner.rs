// src/engine/runner.rs

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::engine::report::{SessionReport, write_session_report};
use crate::exec::ExecutionEngine;
use crate::pipeline::{PipelineState, StagedPipeline};

/// Options influencing how the runner polls.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Delay between scheduling ticks.
    pub poll_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Drives a [`StagedPipeline`] against an execution backend until it reaches
/// a terminal state.
pub struct PipelineRunner<P> {
    pipeline: StagedPipeline<P>,
    engine: Box<dyn ExecutionEngine>,
    options: RunnerOptions,
    cancel_rx: Option<watch::Receiver<bool>>,
    report_path: Option<PathBuf>,
}

impl<P> PipelineRunner<P> {
    pub fn new(
        pipeline: StagedPipeline<P>,
        engine: Box<dyn ExecutionEngine>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            pipeline,
            engine,
            options,
            cancel_rx: None,
            report_path: None,
        }
    }

    /// Watch `rx`; when it turns true the active stage is cancelled and the
    /// run ends failed. Completed stages keep their artifacts.
    pub fn with_cancellation(mut self, rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(rx);
        self
    }

    /// Refresh a JSON session report at `path` on every stage transition.
    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Run the pipeline to a terminal state and return the final report.
    pub async fn run(mut self) -> anyhow::Result<SessionReport> {
        info!(pipeline = %self.pipeline.name(), "runner started");

        let mut report = SessionReport::new(self.pipeline.status());
        let mut last_state = PipelineState::Pending;
        let mut last_stage: Option<String> = None;

        loop {
            let state = self.pipeline.tick(self.engine.as_ref()).await;
            let stage = self.pipeline.current_stage().map(str::to_string);

            if state != last_state || stage != last_stage {
                report.status = self.pipeline.status();
                if state.is_terminal() {
                    report.finished_at = Some(Utc::now());
                }
                self.write_report(&report);
                last_state = state;
                last_stage = stage;
            }

            if state.is_terminal() {
                break;
            }

            let mut cancel_now = false;
            let mut watch_closed = false;
            if let Some(rx) = self.cancel_rx.as_mut() {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.poll_interval) => {}
                    changed = rx.changed() => match changed {
                        Ok(()) => cancel_now = *rx.borrow(),
                        Err(_) => watch_closed = true,
                    }
                }
            } else {
                tokio::time::sleep(self.options.poll_interval).await;
            }
            if watch_closed {
                // Sender gone; nobody can cancel us any more.
                self.cancel_rx = None;
            }
            if cancel_now {
                warn!(pipeline = %self.pipeline.name(), "cancellation requested");
                self.pipeline.cancel(self.engine.as_ref()).await;
            }
        }

        match self.pipeline.state() {
            PipelineState::Succeeded => {
                info!(pipeline = %self.pipeline.name(), "pipeline succeeded");
            }
            _ => {
                let failed: Vec<&str> = report
                    .status
                    .stages
                    .iter()
                    .flat_map(|s| s.members.iter())
                    .filter(|m| m.error.is_some())
                    .map(|m| m.name.as_str())
                    .collect();
                warn!(
                    pipeline = %self.pipeline.name(),
                    failed_members = ?failed,
                    error = ?self.pipeline.error(),
                    "pipeline failed"
                );
            }
        }

        Ok(report)
    }

    fn write_report(&self, report: &SessionReport) {
        if let Some(path) = &self.report_path
            && let Err(err) = write_session_report(path, report)
        {
            warn!(error = %err, "failed to write session report");
        }
    }
}
