use std::error::Error;

use spotpipe::layout::{ExperimentLayout, MAX_BATCHES};
use spotpipe::pipeline::PipelineState;
use spotpipe::task::Memory;
use spotpipe::workflows::{self, WorkflowKind};
use spotpipe_test_utils::fake_engine::FakeEngine;
use spotpipe_test_utils::{builders, drive};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn batch_paths_are_zero_padded_and_mirror_the_directory() -> TestResult {
    let layout = ExperimentLayout::new("exp1");

    let dir = layout.batch_dir("spot_count", 7)?;
    assert_eq!(dir, std::path::PathBuf::from("exp1/spot_count_007"));

    let file = layout.batch_output("spot_count", 7, "csv")?;
    assert_eq!(
        file,
        std::path::PathBuf::from("exp1/spot_count_007/spot_count_007.csv")
    );

    Ok(())
}

#[test]
fn singleton_paths_use_the_bare_stage_name() {
    let layout = ExperimentLayout::new("exp1");

    assert_eq!(
        layout.stage_dir("aggregated_extrema"),
        std::path::PathBuf::from("exp1/aggregated_extrema")
    );
    assert_eq!(
        layout.stage_output("aggregated_extrema", "pkl"),
        std::path::PathBuf::from("exp1/aggregated_extrema/aggregated_extrema.pkl")
    );
}

#[test]
fn batch_indices_beyond_the_padding_width_are_rejected() {
    assert!(ExperimentLayout::batch_label("spot_count", MAX_BATCHES).is_err());
    assert!(ExperimentLayout::batch_label("spot_count", 999).is_ok());
}

#[tokio::test]
async fn spot2d_consumers_reconstruct_producer_paths_exactly() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let params = builders::params(tmp.path(), 3);
    let layout = params.layout.clone();

    let engine = FakeEngine::new();
    let mut pipeline = workflows::build(WorkflowKind::Spot2d, params);

    assert_eq!(drive(&mut pipeline, &engine).await, PipelineState::Succeeded);

    // Stages ran strictly in order, fan-out members in batch order.
    assert_eq!(
        engine.submitted_names(),
        vec![
            "intensity_extrema_000",
            "intensity_extrema_001",
            "intensity_extrema_002",
            "aggregated_extrema",
            "spot_count_000",
            "spot_count_001",
            "spot_count_002",
        ]
    );

    // Round-trip: the spot_count consumer's declared inputs are exactly the
    // paths the producers declared as outputs, including the aggregate from
    // two stages back.
    let submitted = engine.submitted();
    let spot_001 = submitted
        .iter()
        .find(|s| s.name == "spot_count_001")
        .expect("spot_count_001 was submitted");

    let extrema_001 = layout.batch_output("intensity_extrema", 1, "pkl")?;
    let aggregate = layout.stage_output("aggregated_extrema", "pkl");
    assert!(spot_001.inputs.contains(&extrema_001));
    assert!(spot_001.inputs.contains(&aggregate));

    let extrema = submitted
        .iter()
        .find(|s| s.name == "intensity_extrema_001")
        .expect("intensity_extrema_001 was submitted");
    assert_eq!(extrema.outputs, vec![extrema_001]);
    assert_eq!(extrema.memory, Memory::gb(1));
    assert_eq!(extrema.batch_index, Some(1));

    Ok(())
}

#[tokio::test]
async fn spot3d_wires_sites_into_detection_and_concatenates_at_the_end() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let params = builders::params(tmp.path(), 2);
    let layout = params.layout.clone();

    let engine = FakeEngine::new();
    let mut pipeline = workflows::build(WorkflowKind::Spot3d, params);

    assert_eq!(drive(&mut pipeline, &engine).await, PipelineState::Succeeded);

    let submitted = engine.submitted();
    let detect = submitted
        .iter()
        .find(|s| s.name == "spot_count_000")
        .expect("spot_count_000 was submitted");
    assert!(
        detect
            .inputs
            .contains(&layout.batch_output("selected_sites", 0, "pkl")?)
    );
    assert_eq!(detect.memory, Memory::gb(7));

    let aggregate = submitted
        .iter()
        .find(|s| s.name == "aggregated_spot_count")
        .expect("aggregated_spot_count was submitted");
    // The concatenation script writes to stdout, redirected onto the output.
    assert_eq!(aggregate.stdout, "aggregated_spot_count.csv");
    assert!(
        aggregate
            .inputs
            .contains(&layout.batch_output("spot_count", 1, "csv")?)
    );

    Ok(())
}
