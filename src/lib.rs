// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod task;
pub mod workflows;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::watch;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate, validate_workflow_requirements};
use crate::engine::{PipelineRunner, RunnerOptions};
use crate::exec::LocalEngine;
use crate::pipeline::{PipelineState, StagedPipeline};
use crate::workflows::{ExperimentParams, WorkflowKind};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - workflow selection and pipeline construction
/// - the local execution engine and the polling runner
/// - Ctrl-C handling and the session report
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let workflow: WorkflowKind = args
        .workflow
        .as_deref()
        .unwrap_or(&cfg.run.workflow)
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    validate_workflow_requirements(&cfg, workflow)?;

    let params = ExperimentParams::from_config(&cfg);
    let report_path = params.layout.root().join("session.json");
    let pipeline = workflows::build(workflow, params);

    if args.dry_run {
        print_dry_run(&pipeline, &cfg);
        return Ok(());
    }

    // Ctrl-C → cancel the active stage and end the run failed.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = cancel_tx.send(true);
    });

    let options = RunnerOptions {
        poll_interval: Duration::from_millis(cfg.run.poll_interval_ms),
    };
    let runner = PipelineRunner::new(pipeline, Box::new(LocalEngine::new()), options)
        .with_cancellation(cancel_rx)
        .with_report(report_path.clone());

    let report = runner.run().await?;
    info!(report = %report_path.display(), "session report written");

    match report.status.state {
        PipelineState::Succeeded => Ok(()),
        _ => {
            let cause = report
                .status
                .error
                .clone()
                .unwrap_or_else(|| "unknown failure".to_string());
            let failed: Vec<String> = report
                .status
                .stages
                .iter()
                .flat_map(|s| s.members.iter())
                .filter(|m| m.error.is_some())
                .map(|m| m.name.clone())
                .collect();
            Err(anyhow!(
                "pipeline '{}' failed [{}]: {cause}",
                report.status.pipeline,
                failed.join(", ")
            ))
        }
    }
}

/// Simple dry-run output: print stages, their consumed producers and the
/// configured fan-out width.
fn print_dry_run(pipeline: &StagedPipeline<ExperimentParams>, cfg: &ConfigFile) {
    println!("spotpipe dry-run");
    println!("  workflow = {}", pipeline.name());
    println!(
        "  experiment root = {}",
        pipeline.params().layout.root().display()
    );
    println!("  n_batches = {}", cfg.sweep.n_batches);
    println!();

    println!("stages ({}):", pipeline.stages().len());
    for stage in pipeline.stages() {
        println!("  - {}", stage.name());
        if !stage.consumes().is_empty() {
            println!("      consumes: {:?}", stage.consumes());
        }
    }
}
