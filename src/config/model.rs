// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [experiment]
/// name = "exp1"
/// plate = "plate01"
/// channel = "sdcGFP"
/// positive_wells = ["B02", "B03"]
/// negative_wells = ["B04", "B05"]
///
/// [server]
/// host = "app.tissuemaps.org"
/// username = "joe"
/// password = "secret"
///
/// [sweep]
/// thresholds = [0.02, 0.04, 0.02]
/// n_sites = 5
/// n_batches = 8
///
/// [run]
/// workflow = "spot-2d"
/// scripts_dir = "scripts"
/// ```
///
/// `[server]` and `[run]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub experiment: ExperimentSection,

    #[serde(default)]
    pub server: ServerSection,

    pub sweep: SweepSection,

    #[serde(default)]
    pub run: RunSection,
}

/// `[experiment]` section: where results live and which wells are controls.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentSection {
    /// Experiment name; becomes the root directory for all stage outputs.
    pub name: String,

    /// Parent directory for the experiment root.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_plate")]
    pub plate: String,

    /// Channel to analyse; required by the spot-2d workflow.
    #[serde(default)]
    pub channel: Option<String>,

    pub positive_wells: Vec<String>,
    pub negative_wells: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_plate() -> String {
    "plate01".to_string()
}

/// `[server]` section: the imaging platform the worker scripts talk to.
///
/// The core never connects to it; these values only become command
/// arguments of the submitted tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "app.tissuemaps.org".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// `[sweep]` section: detection sweep parameters and fan-out width.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepSection {
    /// Threshold range as `[start, end, step]`.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,

    /// Hard rescaling limits (four values), used by the spot-3d workflow.
    #[serde(default = "default_hard_rescaling")]
    pub hard_rescaling: Vec<f64>,

    /// Number of randomly selected sites per well in each batch.
    pub n_sites: u32,

    /// Fan-out width of the batched stages.
    pub n_batches: u32,
}

fn default_thresholds() -> Vec<f64> {
    vec![0.02, 0.04, 0.02]
}

fn default_hard_rescaling() -> Vec<f64> {
    vec![120.0, 120.0, 1000.0, 1000.0]
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Which pipeline to run: `"spot-2d"` or `"spot-3d"`.
    #[serde(default = "default_workflow")]
    pub workflow: String,

    /// Directory holding the worker scripts shipped with each task.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Milliseconds between scheduling ticks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_workflow() -> String {
    "spot-2d".to_string()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            workflow: default_workflow(),
            scripts_dir: default_scripts_dir(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
