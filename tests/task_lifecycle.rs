use std::error::Error;

use spotpipe::errors::PipelineError;
use spotpipe::task::{Task, TaskSpec, TaskState};
use spotpipe_test_utils::fake_engine::{FakeBehaviour, FakeEngine};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn missing_input_fails_before_anything_reaches_the_backend() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let missing = tmp.path().join("nope.pkl");

    let engine = FakeEngine::new();
    let mut task = Task::new(
        TaskSpec::new("t", "python")
            .input(missing.clone())
            .with_output_dir(tmp.path()),
    );

    let err = task.submit(&engine).await.unwrap_err();
    assert_eq!(err, PipelineError::MissingInput { path: missing });
    assert_eq!(task.state(), TaskState::Failed);
    assert!(engine.submitted().is_empty());

    Ok(())
}

#[tokio::test]
async fn backend_success_without_outputs_is_a_failure() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let output = tmp.path().join("t/t.csv");

    let engine = FakeEngine::new();
    engine.behave("t", FakeBehaviour::SucceedWithoutOutputs);

    let mut task = Task::new(
        TaskSpec::new("t", "python")
            .output(output.clone())
            .with_output_dir(tmp.path().join("t")),
    );
    task.submit(&engine).await?;

    assert_eq!(task.poll(&engine).await, TaskState::Failed);
    assert_eq!(task.error(), Some(&PipelineError::OutputMissing { path: output }));

    Ok(())
}

#[tokio::test]
async fn backend_success_with_outputs_on_disk_succeeds() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let output = tmp.path().join("t/t.csv");

    let engine = FakeEngine::new();
    let mut task = Task::new(
        TaskSpec::new("t", "python")
            .output(output.clone())
            .with_output_dir(tmp.path().join("t")),
    );
    task.submit(&engine).await?;

    assert_eq!(task.poll(&engine).await, TaskState::Succeeded);
    assert!(output.exists());

    Ok(())
}

#[tokio::test]
async fn repolling_a_terminal_task_is_idempotent() -> TestResult {
    let tmp = tempfile::tempdir()?;

    let engine = FakeEngine::new();
    let mut task = Task::new(
        TaskSpec::new("t", "python")
            .output(tmp.path().join("t/t.csv"))
            .with_output_dir(tmp.path().join("t")),
    );
    task.submit(&engine).await?;

    assert_eq!(task.poll(&engine).await, TaskState::Succeeded);
    assert_eq!(engine.polls_for("t"), 1);

    // Terminal: no further engine traffic, same answer.
    assert_eq!(task.poll(&engine).await, TaskState::Succeeded);
    assert_eq!(task.poll(&engine).await, TaskState::Succeeded);
    assert_eq!(engine.polls_for("t"), 1);

    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_a_backend_failure() -> TestResult {
    let engine = FakeEngine::new();
    engine.behave("t", FakeBehaviour::FailExit(7));

    let mut task = Task::new(TaskSpec::new("t", "python"));
    task.submit(&engine).await?;

    assert_eq!(task.poll(&engine).await, TaskState::Failed);
    assert_eq!(
        task.error(),
        Some(&PipelineError::Backend("exit code 7".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn rejected_submission_goes_straight_to_failed() {
    let engine = FakeEngine::new();
    engine.behave("t", FakeBehaviour::RejectSubmission);

    let mut task = Task::new(TaskSpec::new("t", "python"));
    let err = task.submit(&engine).await.unwrap_err();

    assert!(matches!(err, PipelineError::Submission(_)));
    assert_eq!(task.state(), TaskState::Failed);
}

#[tokio::test]
async fn cancelling_a_running_task_fails_it_with_cancelled() -> TestResult {
    let engine = FakeEngine::new();
    engine.behave("t", FakeBehaviour::RunForever);

    let mut task = Task::new(TaskSpec::new("t", "python"));
    task.submit(&engine).await?;
    assert_eq!(task.poll(&engine).await, TaskState::Running);

    task.cancel(&engine).await;
    assert_eq!(task.state(), TaskState::Failed);
    assert_eq!(task.error(), Some(&PipelineError::Cancelled));
    assert_eq!(engine.cancelled(), vec!["t"]);

    // Already terminal; re-polling does not resurrect or re-query it.
    assert_eq!(task.poll(&engine).await, TaskState::Failed);
    assert_eq!(engine.polls_for("t"), 1);

    Ok(())
}
