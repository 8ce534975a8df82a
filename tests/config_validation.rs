use std::error::Error;

use spotpipe::config::{ConfigFile, load_and_validate, validate_config};

type TestResult = Result<(), Box<dyn Error>>;

const MINIMAL: &str = r#"
[experiment]
name = "exp1"
channel = "sdcGFP"
positive_wells = ["B02"]
negative_wells = ["B03"]

[sweep]
n_sites = 5
n_batches = 8
"#;

fn parse(toml: &str) -> ConfigFile {
    toml::from_str(toml).expect("config parses")
}

#[test]
fn minimal_config_gets_defaults_and_validates() -> TestResult {
    let cfg = parse(MINIMAL);

    assert_eq!(cfg.server.host, "app.tissuemaps.org");
    assert_eq!(cfg.experiment.plate, "plate01");
    assert_eq!(cfg.sweep.thresholds, vec![0.02, 0.04, 0.02]);
    assert_eq!(cfg.run.workflow, "spot-2d");
    assert_eq!(cfg.run.poll_interval_ms, 2000);

    validate_config(&cfg)?;
    Ok(())
}

#[test]
fn n_batches_bounds_are_enforced() {
    let mut cfg = parse(MINIMAL);
    cfg.sweep.n_batches = 0;
    assert!(validate_config(&cfg).is_err());

    cfg.sweep.n_batches = 1001;
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("n_batches"), "got: {err}");

    cfg.sweep.n_batches = 1000;
    assert!(validate_config(&cfg).is_ok());
}

#[test]
fn wells_must_be_configured() {
    let mut cfg = parse(MINIMAL);
    cfg.experiment.positive_wells.clear();
    assert!(validate_config(&cfg).is_err());

    let mut cfg = parse(MINIMAL);
    cfg.experiment.negative_wells.clear();
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn thresholds_must_be_a_well_formed_triple() {
    let mut cfg = parse(MINIMAL);
    cfg.sweep.thresholds = vec![0.02, 0.04];
    assert!(validate_config(&cfg).is_err());

    let mut cfg = parse(MINIMAL);
    cfg.sweep.thresholds = vec![0.02, 0.04, 0.0];
    assert!(validate_config(&cfg).is_err());

    let mut cfg = parse(MINIMAL);
    cfg.sweep.thresholds = vec![0.05, 0.04, 0.01];
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn the_experiment_name_must_be_a_directory_name() {
    let mut cfg = parse(MINIMAL);
    cfg.experiment.name = "exp/one".to_string();
    assert!(validate_config(&cfg).is_err());

    let mut cfg = parse(MINIMAL);
    cfg.experiment.name = "  ".to_string();
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn unknown_workflows_are_rejected() {
    let mut cfg = parse(MINIMAL);
    cfg.run.workflow = "spot-4d".to_string();
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("unknown workflow"), "got: {err}");
}

#[test]
fn spot2d_requires_a_channel_but_spot3d_does_not() {
    let mut cfg = parse(MINIMAL);
    cfg.experiment.channel = None;
    assert!(validate_config(&cfg).is_err());

    cfg.run.workflow = "spot-3d".to_string();
    assert!(validate_config(&cfg).is_ok());
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut cfg = parse(MINIMAL);
    cfg.run.poll_interval_ms = 0;
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn load_and_validate_reads_a_file_from_disk() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Spotpipe.toml");
    std::fs::write(&path, MINIMAL)?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.experiment.name, "exp1");

    assert!(load_and_validate(tmp.path().join("absent.toml")).is_err());
    Ok(())
}
