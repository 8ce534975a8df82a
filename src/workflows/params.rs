// src/workflows/params.rs

use std::path::PathBuf;

use crate::config::ConfigFile;
use crate::layout::ExperimentLayout;

/// Immutable parameter set handed to every stage generator.
///
/// Assembled once from the validated config; stage generators receive it by
/// reference together with the output ledger and keep no captured state of
/// their own.
#[derive(Debug, Clone)]
pub struct ExperimentParams {
    pub layout: ExperimentLayout,
    pub experiment: String,
    pub host: String,
    pub username: String,
    pub password: String,
    pub plate: String,
    pub channel: String,
    pub positive_wells: Vec<String>,
    pub negative_wells: Vec<String>,
    /// `[start, end, step]` detection thresholds.
    pub thresholds: [f64; 3],
    /// Hard rescaling limits for the 3D workflow.
    pub hard_rescaling: [f64; 4],
    pub n_sites: u32,
    pub n_batches: u32,
    pub scripts_dir: PathBuf,
}

impl ExperimentParams {
    /// Assemble params from a validated configuration.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let root = cfg.experiment.root.join(&cfg.experiment.name);

        let mut thresholds = [0.0; 3];
        for (slot, value) in thresholds.iter_mut().zip(&cfg.sweep.thresholds) {
            *slot = *value;
        }
        let mut hard_rescaling = [0.0; 4];
        for (slot, value) in hard_rescaling.iter_mut().zip(&cfg.sweep.hard_rescaling) {
            *slot = *value;
        }

        Self {
            layout: ExperimentLayout::new(root),
            experiment: cfg.experiment.name.clone(),
            host: cfg.server.host.clone(),
            username: cfg.server.username.clone(),
            password: cfg.server.password.clone(),
            plate: cfg.experiment.plate.clone(),
            channel: cfg.experiment.channel.clone().unwrap_or_default(),
            positive_wells: cfg.experiment.positive_wells.clone(),
            negative_wells: cfg.experiment.negative_wells.clone(),
            thresholds,
            hard_rescaling,
            n_sites: cfg.sweep.n_sites,
            n_batches: cfg.sweep.n_batches,
            scripts_dir: cfg.run.scripts_dir.clone(),
        }
    }

    /// Path of a worker script shipped with a task.
    pub fn script(&self, file: &str) -> PathBuf {
        self.scripts_dir.join(file)
    }
}
