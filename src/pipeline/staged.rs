// src/pipeline/staged.rs

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::ExecutionEngine;
use crate::pipeline::outputs::{OutputLedger, StageOutputs};
use crate::pipeline::status::{MemberStatus, PipelineStatus, StageStatus};
use crate::task::{ParallelTaskGroup, Task, TaskState};

/// Overall pipeline state. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Pending => "pending",
            PipelineState::Running => "running",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Payload of one stage: a single task or a parallel fan-out group.
#[derive(Debug)]
pub enum StageUnit {
    Single(Task),
    Parallel(ParallelTaskGroup),
}

impl StageUnit {
    pub async fn submit_all(&mut self, engine: &dyn ExecutionEngine) {
        match self {
            StageUnit::Single(task) => {
                // A rejection is recorded on the task; the next poll turns it
                // into a stage failure.
                let _ = task.submit(engine).await;
            }
            StageUnit::Parallel(group) => group.submit_all(engine).await,
        }
    }

    pub async fn poll_all(&mut self, engine: &dyn ExecutionEngine) -> TaskState {
        match self {
            StageUnit::Single(task) => task.poll(engine).await,
            StageUnit::Parallel(group) => group.poll_all(engine).await,
        }
    }

    pub fn aggregate_state(&self) -> TaskState {
        match self {
            StageUnit::Single(task) => task.state(),
            StageUnit::Parallel(group) => group.aggregate_state(),
        }
    }

    pub async fn cancel_non_terminal(&mut self, engine: &dyn ExecutionEngine) {
        match self {
            StageUnit::Single(task) => {
                if !task.state().is_terminal() {
                    task.cancel(engine).await;
                }
            }
            StageUnit::Parallel(group) => group.cancel_non_terminal(engine).await,
        }
    }

    /// Primary outputs to record in the ledger once the stage succeeds.
    fn recorded_outputs(&self) -> Option<StageOutputs> {
        match self {
            StageUnit::Single(task) => task
                .spec()
                .primary_output()
                .map(|p| StageOutputs::Single(p.to_path_buf())),
            StageUnit::Parallel(group) => {
                let paths: Option<Vec<_>> = group
                    .members()
                    .iter()
                    .map(|t| t.spec().primary_output().map(Path::to_path_buf))
                    .collect();
                paths.map(StageOutputs::Batched)
            }
        }
    }

    /// Root cause for a failed stage: the first member error that is not
    /// cancellation fallout, falling back to any member error.
    fn first_error(&self) -> Option<PipelineError> {
        match self {
            StageUnit::Single(task) => task.error().cloned(),
            StageUnit::Parallel(group) => {
                let errors: Vec<&PipelineError> =
                    group.members().iter().filter_map(Task::error).collect();
                errors
                    .iter()
                    .find(|e| !matches!(e, PipelineError::Cancelled))
                    .or_else(|| errors.first())
                    .map(|e| (*e).clone())
            }
        }
    }

    fn member_statuses(&self) -> Vec<MemberStatus> {
        match self {
            StageUnit::Single(task) => vec![MemberStatus::of(task)],
            StageUnit::Parallel(group) => {
                group.members().iter().map(MemberStatus::of).collect()
            }
        }
    }
}

/// Generator producing a stage's unit from the pipeline parameters and the
/// recorded outputs of all prior stages. Generators hold no state of their
/// own; everything they need is passed in.
pub type StageBuilder<P> = Box<dyn Fn(&P, &OutputLedger) -> Result<StageUnit> + Send + Sync>;

/// One stage of a pipeline: a name, the producer stages whose outputs the
/// generator reads, and the generator itself.
pub struct StageSpec<P> {
    name: String,
    consumes: Vec<String>,
    builder: StageBuilder<P>,
}

impl<P> StageSpec<P> {
    pub fn new<F>(name: impl Into<String>, consumes: &[&str], builder: F) -> Self
    where
        F: Fn(&P, &OutputLedger) -> Result<StageUnit> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            consumes: consumes.iter().map(|s| s.to_string()).collect(),
            builder: Box::new(builder),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn consumes(&self) -> &[String] {
        &self.consumes
    }
}

impl<P> std::fmt::Debug for StageSpec<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

/// An ordered sequence of stages, advanced strictly one at a time.
///
/// The pipeline owns its stage sequence, the cursor, the active unit and
/// the output ledger. It is mutated only through [`tick`](Self::tick) and
/// [`cancel`](Self::cancel); ticks are the only suspension points, and a
/// tick on a terminal pipeline is a no-op.
///
/// Failure semantics: a failed stage halts the pipeline with the failing
/// member's own error as root cause, and no further stage is instantiated.
/// There is no retry and no partial re-entry into a completed stage. When a
/// fan-out member fails, still-running siblings receive best-effort cancel
/// requests before the stage is declared failed.
pub struct StagedPipeline<P> {
    name: String,
    params: P,
    stages: Vec<StageSpec<P>>,
    cursor: usize,
    state: PipelineState,
    ledger: OutputLedger,
    active: Option<StageUnit>,
    history: Vec<StageStatus>,
    error: Option<PipelineError>,
}

impl<P> StagedPipeline<P> {
    pub fn new(name: impl Into<String>, params: P, stages: Vec<StageSpec<P>>) -> Self {
        let name = name.into();
        let mut state = PipelineState::Pending;
        let mut error = None;

        // Duplicate stage names would make ledger lookups ambiguous.
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name.clone()) {
                error = Some(PipelineError::Configuration(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
                state = PipelineState::Failed;
                break;
            }
        }

        Self {
            name,
            params,
            stages,
            cursor: 0,
            state,
            ledger: OutputLedger::new(),
            active: None,
            history: Vec::new(),
            error,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The error that halted the pipeline, if it failed.
    pub fn error(&self) -> Option<&PipelineError> {
        self.error.as_ref()
    }

    pub fn stages(&self) -> &[StageSpec<P>] {
        &self.stages
    }

    /// Name of the stage currently in flight, if any.
    pub fn current_stage(&self) -> Option<&str> {
        if self.state == PipelineState::Running {
            self.stages.get(self.cursor).map(StageSpec::name)
        } else {
            None
        }
    }

    /// Recorded outputs of all completed stages.
    pub fn ledger(&self) -> &OutputLedger {
        &self.ledger
    }

    /// One scheduling tick: poll the active stage and advance, fail or stay.
    ///
    /// A pipeline with zero stages succeeds on its first tick without ever
    /// touching the engine.
    pub async fn tick(&mut self, engine: &dyn ExecutionEngine) -> PipelineState {
        match self.state {
            PipelineState::Succeeded | PipelineState::Failed => self.state,
            PipelineState::Pending => {
                if self.stages.is_empty() {
                    info!(pipeline = %self.name, "no stages; pipeline succeeded");
                    self.state = PipelineState::Succeeded;
                    return self.state;
                }
                self.state = PipelineState::Running;
                self.enter_stage(engine).await;
                self.state
            }
            PipelineState::Running => {
                let Some(unit) = self.active.as_mut() else {
                    // Unreachable through the public API; fail loudly rather
                    // than spinning forever.
                    self.error = Some(PipelineError::Configuration(
                        "pipeline running with no active stage".to_string(),
                    ));
                    self.state = PipelineState::Failed;
                    return self.state;
                };
                match unit.poll_all(engine).await {
                    TaskState::Succeeded => self.finish_stage(engine).await,
                    TaskState::Failed => self.fail_stage(engine).await,
                    _ => {}
                }
                self.state
            }
        }
    }

    /// Cancel the whole run: cancel the active stage's members and mark the
    /// pipeline failed. Completed stages keep their artifacts on disk.
    pub async fn cancel(&mut self, engine: &dyn ExecutionEngine) {
        if self.state.is_terminal() {
            return;
        }
        info!(pipeline = %self.name, "cancelling pipeline");
        if let Some(mut unit) = self.active.take() {
            unit.cancel_non_terminal(engine).await;
            let stage_name = self.stages[self.cursor].name.clone();
            self.history.push(StageStatus {
                name: stage_name,
                state: TaskState::Failed,
                members: unit.member_statuses(),
            });
        }
        if self.error.is_none() {
            self.error = Some(PipelineError::Cancelled);
        }
        self.state = PipelineState::Failed;
    }

    /// Queryable snapshot: past stages, the active stage's members, and the
    /// root-cause error if the pipeline failed.
    pub fn status(&self) -> PipelineStatus {
        let mut stages = self.history.clone();
        if let Some(unit) = &self.active {
            stages.push(StageStatus {
                name: self.stages[self.cursor].name.clone(),
                state: unit.aggregate_state(),
                members: unit.member_statuses(),
            });
        }
        PipelineStatus {
            pipeline: self.name.clone(),
            state: self.state,
            current_stage: self.current_stage().map(str::to_string),
            stages,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Instantiate and submit the stage at the cursor.
    ///
    /// A generator error is treated identically to the stage failing at
    /// runtime: the pipeline halts with that error.
    async fn enter_stage(&mut self, engine: &dyn ExecutionEngine) {
        let stage = &self.stages[self.cursor];
        info!(
            pipeline = %self.name,
            stage = %stage.name,
            index = self.cursor,
            "entering stage"
        );

        for producer in &stage.consumes {
            if !self.ledger.contains(producer) {
                let err = PipelineError::Configuration(format!(
                    "stage '{}' consumes '{producer}', which has no recorded outputs",
                    stage.name
                ));
                warn!(pipeline = %self.name, stage = %stage.name, error = %err, "stage construction failed");
                self.error = Some(err);
                self.state = PipelineState::Failed;
                return;
            }
        }

        match (stage.builder)(&self.params, &self.ledger) {
            Ok(mut unit) => {
                unit.submit_all(engine).await;
                self.active = Some(unit);
            }
            Err(err) => {
                warn!(pipeline = %self.name, stage = %stage.name, error = %err, "stage construction failed");
                self.error = Some(err);
                self.state = PipelineState::Failed;
            }
        }
    }

    async fn finish_stage(&mut self, engine: &dyn ExecutionEngine) {
        let stage_name = self.stages[self.cursor].name.clone();
        if let Some(unit) = self.active.take() {
            if let Some(outputs) = unit.recorded_outputs() {
                self.ledger.record(stage_name.clone(), outputs);
            }
            self.history.push(StageStatus {
                name: stage_name.clone(),
                state: TaskState::Succeeded,
                members: unit.member_statuses(),
            });
        }
        info!(pipeline = %self.name, stage = %stage_name, "stage succeeded");

        self.cursor += 1;
        if self.cursor == self.stages.len() {
            info!(pipeline = %self.name, "pipeline succeeded");
            self.state = PipelineState::Succeeded;
        } else {
            self.enter_stage(engine).await;
        }
    }

    async fn fail_stage(&mut self, engine: &dyn ExecutionEngine) {
        let stage_name = self.stages[self.cursor].name.clone();
        if let Some(mut unit) = self.active.take() {
            // Fail-fast policy: stop still-running siblings before declaring
            // the stage failed; completed members keep their outputs.
            unit.cancel_non_terminal(engine).await;
            self.error = unit.first_error();
            self.history.push(StageStatus {
                name: stage_name.clone(),
                state: TaskState::Failed,
                members: unit.member_statuses(),
            });
        }
        warn!(
            pipeline = %self.name,
            stage = %stage_name,
            error = ?self.error,
            "stage failed; halting pipeline"
        );
        self.state = PipelineState::Failed;
    }
}
