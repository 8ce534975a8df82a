// src/config/validate.rs

use anyhow::{Result, anyhow};

use crate::config::model::ConfigFile;
use crate::layout::MAX_BATCHES;
use crate::workflows::WorkflowKind;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - the experiment name is non-empty and usable as a directory name
/// - both wells lists are non-empty
/// - `n_batches` is within `1..=MAX_BATCHES` (the 3-digit addressing bound)
/// - `n_sites >= 1`
/// - thresholds form a `[start, end, step]` triple with a positive step
/// - `hard_rescaling` has four values
/// - the configured workflow is known and its requirements are met
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_experiment(cfg)?;
    validate_sweep(cfg)?;
    validate_run(cfg)?;
    Ok(())
}

fn validate_experiment(cfg: &ConfigFile) -> Result<()> {
    let name = cfg.experiment.name.trim();
    if name.is_empty() {
        return Err(anyhow!("[experiment].name must not be empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(anyhow!(
            "[experiment].name '{}' must be usable as a directory name",
            name
        ));
    }
    if cfg.experiment.positive_wells.is_empty() {
        return Err(anyhow!("[experiment].positive_wells must not be empty"));
    }
    if cfg.experiment.negative_wells.is_empty() {
        return Err(anyhow!("[experiment].negative_wells must not be empty"));
    }
    Ok(())
}

fn validate_sweep(cfg: &ConfigFile) -> Result<()> {
    let sweep = &cfg.sweep;
    if sweep.n_batches == 0 {
        return Err(anyhow!("[sweep].n_batches must be >= 1 (got 0)"));
    }
    if sweep.n_batches > MAX_BATCHES {
        return Err(anyhow!(
            "[sweep].n_batches must be <= {} (3-digit batch addressing), got {}",
            MAX_BATCHES,
            sweep.n_batches
        ));
    }
    if sweep.n_sites == 0 {
        return Err(anyhow!("[sweep].n_sites must be >= 1 (got 0)"));
    }
    if sweep.thresholds.len() != 3 {
        return Err(anyhow!(
            "[sweep].thresholds must be a [start, end, step] triple, got {} values",
            sweep.thresholds.len()
        ));
    }
    let [start, end, step] = [
        sweep.thresholds[0],
        sweep.thresholds[1],
        sweep.thresholds[2],
    ];
    if step <= 0.0 {
        return Err(anyhow!("[sweep].thresholds step must be positive"));
    }
    if start > end {
        return Err(anyhow!(
            "[sweep].thresholds start {} exceeds end {}",
            start,
            end
        ));
    }
    if sweep.hard_rescaling.len() != 4 {
        return Err(anyhow!(
            "[sweep].hard_rescaling must have four values, got {}",
            sweep.hard_rescaling.len()
        ));
    }
    Ok(())
}

fn validate_run(cfg: &ConfigFile) -> Result<()> {
    let kind: WorkflowKind = cfg.run.workflow.parse().map_err(|e: String| anyhow!(e))?;
    validate_workflow_requirements(cfg, kind)?;
    if cfg.run.poll_interval_ms == 0 {
        return Err(anyhow!("[run].poll_interval_ms must be >= 1 (got 0)"));
    }
    Ok(())
}

/// Checks that apply to one specific workflow, used both when validating the
/// config and when the workflow is overridden on the command line.
pub fn validate_workflow_requirements(cfg: &ConfigFile, kind: WorkflowKind) -> Result<()> {
    if kind == WorkflowKind::Spot2d
        && cfg.experiment.channel.as_deref().unwrap_or("").is_empty()
    {
        return Err(anyhow!(
            "[experiment].channel is required by the spot-2d workflow"
        ));
    }
    Ok(())
}
