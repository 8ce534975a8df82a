use std::path::{Path, PathBuf};

use spotpipe::config::{
    ConfigFile, ExperimentSection, RunSection, ServerSection, SweepSection,
};
use spotpipe::task::{Task, TaskSpec};
use spotpipe::workflows::ExperimentParams;

/// Minimal valid configuration rooted at `root`, for tests.
pub fn config(root: &Path, n_batches: u32) -> ConfigFile {
    ConfigFile {
        experiment: ExperimentSection {
            name: "exp1".to_string(),
            root: root.to_path_buf(),
            plate: "plate01".to_string(),
            channel: Some("sdcGFP".to_string()),
            positive_wells: vec!["B02".to_string()],
            negative_wells: vec!["B03".to_string()],
        },
        server: ServerSection {
            host: "tm.example.org".to_string(),
            username: "tester".to_string(),
            password: "secret".to_string(),
        },
        sweep: SweepSection {
            thresholds: vec![0.02, 0.04, 0.02],
            hard_rescaling: vec![120.0, 120.0, 1000.0, 1000.0],
            n_sites: 2,
            n_batches,
        },
        run: RunSection {
            workflow: "spot-2d".to_string(),
            scripts_dir: root.join("scripts"),
            poll_interval_ms: 10,
        },
    }
}

/// Params derived from [`config`], with the scripts directory created and
/// stub scripts in place so submission-time input validation passes.
pub fn params(root: &Path, n_batches: u32) -> ExperimentParams {
    let cfg = config(root, n_batches);
    let scripts_dir = cfg.run.scripts_dir.clone();
    std::fs::create_dir_all(&scripts_dir).expect("creating scripts dir");
    for script in [
        "get_intensity_extrema.py",
        "aggregate_rescaling_limits.py",
        "get_spot_count_threshold_series.py",
        "select_sites_3D.py",
        "get_spot_count_threshold_series_3D_mw.py",
        "concatenate_csv.sh",
    ] {
        std::fs::write(scripts_dir.join(script), b"# stub").expect("writing stub script");
    }
    ExperimentParams::from_config(&cfg)
}

/// A task that runs `sh -c <command>` in `dir` with the given declared
/// outputs.
pub fn sh_task(name: &str, dir: &Path, command: &str, outputs: &[PathBuf]) -> Task {
    let mut spec = TaskSpec::new(name, "sh")
        .arg("-c")
        .arg(command)
        .with_output_dir(dir);
    for output in outputs {
        spec = spec.output(output.clone());
    }
    Task::new(spec)
}
