use std::error::Error;
use std::time::Duration;

use spotpipe::engine::{PipelineRunner, RunnerOptions};
use spotpipe::exec::LocalEngine;
use spotpipe::pipeline::{
    OutputLedger, PipelineState, StageSpec, StageUnit, StagedPipeline,
};
use spotpipe::task::Task;
use spotpipe_test_utils::builders::sh_task;
use spotpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn options() -> RunnerOptions {
    RunnerOptions {
        poll_interval: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn real_processes_run_through_both_stages_and_leave_outputs() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let write_dir = tmp.path().join("write");
    let copy_dir = tmp.path().join("copy");
    let write_out = write_dir.join("write.txt");
    let copy_out = copy_dir.join("copy.txt");
    let report_path = tmp.path().join("session.json");

    let write_dir_decl = write_dir.clone();
    let write_out_decl = write_out.clone();
    let copy_dir_decl = copy_dir.clone();
    let copy_out_decl = copy_out.clone();

    let stages: Vec<StageSpec<()>> = vec![
        StageSpec::new("write", &[], move |_: &(), _: &OutputLedger| {
            Ok(StageUnit::Single(sh_task(
                "write",
                &write_dir_decl,
                "printf hello > write.txt",
                &[write_out_decl.clone()],
            )))
        }),
        StageSpec::new("copy", &["write"], move |_: &(), outputs: &OutputLedger| {
            let upstream = outputs.single("write")?;
            let task: Task = sh_task(
                "copy",
                &copy_dir_decl,
                &format!("cat {} > copy.txt", upstream.display()),
                &[copy_out_decl.clone()],
            );
            Ok(StageUnit::Single(task))
        }),
    ];

    let pipeline = StagedPipeline::new("p", (), stages);
    let runner = PipelineRunner::new(pipeline, Box::new(LocalEngine::new()), options())
        .with_report(report_path.clone());

    let report = runner.run().await?;
    assert_eq!(report.status.state, PipelineState::Succeeded);
    assert!(report.finished_at.is_some());

    assert_eq!(std::fs::read_to_string(&write_out)?, "hello");
    assert_eq!(std::fs::read_to_string(&copy_out)?, "hello");

    let written = std::fs::read_to_string(&report_path)?;
    assert!(written.contains("\"succeeded\""));

    Ok(())
}

#[tokio::test]
async fn a_nonzero_exit_fails_the_run_with_the_exit_code() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("boom");

    let dir_decl = dir.clone();
    let stages: Vec<StageSpec<()>> = vec![StageSpec::new(
        "boom",
        &[],
        move |_: &(), _: &OutputLedger| {
            Ok(StageUnit::Single(sh_task("boom", &dir_decl, "exit 3", &[])))
        },
    )];

    let pipeline = StagedPipeline::new("p", (), stages);
    let runner = PipelineRunner::new(pipeline, Box::new(LocalEngine::new()), options());

    let report = runner.run().await?;
    assert_eq!(report.status.state, PipelineState::Failed);
    let error = report.status.error.expect("root cause recorded");
    assert!(error.contains("exit code 3"), "unexpected error: {error}");

    Ok(())
}

#[tokio::test]
async fn an_undelivered_output_fails_despite_process_success() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("quiet");
    let promised = dir.join("quiet.csv");

    let dir_decl = dir.clone();
    let promised_decl = promised.clone();
    let stages: Vec<StageSpec<()>> = vec![StageSpec::new(
        "quiet",
        &[],
        move |_: &(), _: &OutputLedger| {
            // Exits 0 but never writes the declared output.
            Ok(StageUnit::Single(sh_task(
                "quiet",
                &dir_decl,
                "true",
                &[promised_decl.clone()],
            )))
        },
    )];

    let pipeline = StagedPipeline::new("p", (), stages);
    let runner = PipelineRunner::new(pipeline, Box::new(LocalEngine::new()), options());

    let report = runner.run().await?;
    assert_eq!(report.status.state, PipelineState::Failed);
    let error = report.status.error.expect("root cause recorded");
    assert!(
        error.contains("output missing or empty"),
        "unexpected error: {error}"
    );

    Ok(())
}

#[tokio::test]
async fn stdout_redirection_lands_in_the_output_directory() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("echo");

    let dir_decl = dir.clone();
    let stages: Vec<StageSpec<()>> = vec![StageSpec::new(
        "echo",
        &[],
        move |_: &(), _: &OutputLedger| {
            Ok(StageUnit::Single(sh_task(
                "echo",
                &dir_decl,
                "echo from-the-task",
                &[],
            )))
        },
    )];

    let pipeline = StagedPipeline::new("p", (), stages);
    let runner = PipelineRunner::new(pipeline, Box::new(LocalEngine::new()), options());

    let report = runner.run().await?;
    assert_eq!(report.status.state, PipelineState::Succeeded);

    let stdout = std::fs::read_to_string(dir.join("stdout.txt"))?;
    assert_eq!(stdout.trim(), "from-the-task");

    Ok(())
}
