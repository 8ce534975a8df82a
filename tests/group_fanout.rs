use std::error::Error;

use spotpipe::errors::PipelineError;
use spotpipe::task::{ParallelTaskGroup, Task, TaskSpec, TaskState};
use spotpipe_test_utils::fake_engine::{FakeBehaviour, FakeEngine};

type TestResult = Result<(), Box<dyn Error>>;

fn member(prefix: &str, batch: u32) -> Task {
    Task::new(TaskSpec::new(format!("{prefix}_{batch:03}"), "python").with_batch_index(batch))
}

#[test]
fn build_fans_the_constructor_over_contiguous_batch_indices() -> TestResult {
    let group = ParallelTaskGroup::build("g", 4, |batch| Ok(member("g", batch)))?;

    assert_eq!(group.len(), 4);
    let indices: Vec<Option<u32>> = group.members().iter().map(Task::batch_index).collect();
    assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);
    assert_eq!(group.members()[2].name(), "g_002");

    Ok(())
}

#[test]
fn zero_batches_is_a_configuration_error() {
    let err = ParallelTaskGroup::build("g", 0, |batch| Ok(member("g", batch))).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn widths_beyond_the_addressing_limit_are_rejected() {
    let err = ParallelTaskGroup::build("g", 1001, |batch| Ok(member("g", batch))).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(ParallelTaskGroup::build("g", 1000, |batch| Ok(member("g", batch))).is_ok());
}

#[test]
fn a_constructor_that_mislabels_batches_is_rejected() {
    // Every member claims batch 0; slot 1 breaks the addressing contract.
    let err = ParallelTaskGroup::build("g", 2, |_| Ok(member("g", 0))).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[tokio::test]
async fn one_failed_member_fails_the_aggregate_regardless_of_siblings() -> TestResult {
    let engine = FakeEngine::new();
    engine.behave("g_000", FakeBehaviour::RunForever);
    engine.behave("g_001", FakeBehaviour::FailExit(2));
    engine.behave("g_002", FakeBehaviour::RunForever);

    let mut group = ParallelTaskGroup::build("g", 3, |batch| Ok(member("g", batch)))?;
    group.submit_all(&engine).await;

    assert_eq!(group.poll_all(&engine).await, TaskState::Failed);

    // The failing member stays attributable.
    let failed: Vec<&str> = group.failed_members().map(Task::name).collect();
    assert_eq!(failed, vec!["g_001"]);
    assert_eq!(
        group.members()[1].error(),
        Some(&PipelineError::Backend("exit code 2".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn aggregate_success_requires_unanimity() -> TestResult {
    let engine = FakeEngine::new();
    engine.behave("g_002", FakeBehaviour::RunForever);

    let mut group = ParallelTaskGroup::build("g", 3, |batch| Ok(member("g", batch)))?;
    group.submit_all(&engine).await;

    // Two members finish, one keeps running: the group is still in flight.
    assert_eq!(group.poll_all(&engine).await, TaskState::Running);

    engine.behave("g_002", FakeBehaviour::Succeed);
    assert_eq!(group.poll_all(&engine).await, TaskState::Succeeded);

    Ok(())
}

#[tokio::test]
async fn repolling_a_terminal_group_is_idempotent() -> TestResult {
    let engine = FakeEngine::new();

    let mut group = ParallelTaskGroup::build("g", 2, |batch| Ok(member("g", batch)))?;
    group.submit_all(&engine).await;

    assert_eq!(group.poll_all(&engine).await, TaskState::Succeeded);
    let polls = engine.polls_for("g_000");

    assert_eq!(group.poll_all(&engine).await, TaskState::Succeeded);
    assert_eq!(group.aggregate_state(), TaskState::Succeeded);
    assert_eq!(engine.polls_for("g_000"), polls);

    Ok(())
}
