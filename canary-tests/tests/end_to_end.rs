//! End-to-end flows through the shared scaffolding
//!
//! Trigger → queue → execute → aggregate, with scripted and flaky
//! drivers, against the in-memory record store.

use canary_core::{ExecutionMetadata, StepDefinition, TestResult};
use canary_runtime::{
    BudgetGovernor, ExecutionContext, ExecutionOrchestrator, LocalQueue, RetryPolicy,
    StepExecutor, SuiteOrchestrator,
};
use canary_storage::{MemoryStore, RecordStore, TestCaseModel};
use canary_tests::assertions::{assert_suite_consistent, ExecutionAssertions};
use canary_tests::builders::TestCaseBuilder;
use canary_tests::fixtures::{fail_at_third_steps, login_steps, unique_org};
use canary_tests::mocks::{FlakyDriver, MockDriver, NullScreenshots, StaticScreenshots};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn governor() -> BudgetGovernor {
    BudgetGovernor::new(Duration::from_secs(60))
}

#[tokio::test]
async fn login_flow_passes_end_to_end() {
    let org = unique_org();
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let case = TestCaseBuilder::new("login").build().with_steps(login_steps());
    let driver = Arc::new(MockDriver::new());
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots));

    let execution_id = orchestrator
        .create_execution(case.project_id, Some(case.id), &org, &ExecutionMetadata::default())
        .await
        .unwrap();

    let result = orchestrator
        .run(
            execution_id,
            &case,
            ExecutionContext::with_browser(driver.clone()),
            &executor,
            &governor(),
            &org,
        )
        .await
        .unwrap();
    assert_eq!(result, TestResult::Pass);

    let record = store.get_execution(execution_id, &org).await.unwrap();
    ExecutionAssertions::new(&record)
        .assert_status("completed")
        .assert_result(Some("pass"))
        .assert_step_count(5)
        .assert_terminal_timestamps();

    // One driver invocation per step, session closed once
    assert_eq!(driver.call_count(), 5);
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn failed_step_screenshot_lands_in_record() {
    let org = unique_org();
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let case = TestCaseBuilder::new("fails midway")
        .build()
        .with_steps(fail_at_third_steps());
    let driver = Arc::new(MockDriver::new().fail_on("#flaky"));
    let executor = StepExecutor::new(driver.clone(), Arc::new(StaticScreenshots))
        .with_retry_policy(RetryPolicy::no_retry());

    let execution_id = orchestrator
        .create_execution(case.project_id, Some(case.id), &org, &ExecutionMetadata::default())
        .await
        .unwrap();

    let result = orchestrator
        .run(
            execution_id,
            &case,
            ExecutionContext::with_browser(driver.clone()),
            &executor,
            &governor(),
            &org,
        )
        .await
        .unwrap();
    assert_eq!(result, TestResult::Fail);

    let record = store.get_execution(execution_id, &org).await.unwrap();
    ExecutionAssertions::new(&record)
        .assert_status("completed")
        .assert_result(Some("fail"))
        .assert_step_count(3)
        .assert_error_contains("#flaky");

    // The failed UI step captured a screenshot; it is on the step and in
    // the record's deduplicated set
    let failed_step = &record.steps.0[2];
    assert!(failed_step.screenshot.is_some());
    assert_eq!(record.screenshots.0.len(), 1);
}

#[tokio::test]
async fn transient_failures_recover_within_policy() {
    let org = unique_org();
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let case = TestCaseBuilder::new("flaky network")
        .raw_step(StepDefinition::new("navigate").with_target("https://app"))
        .build();

    // Fails twice with a retryable transport error, then succeeds
    let driver = Arc::new(FlakyDriver::new(2));
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots))
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            ..RetryPolicy::for_driver()
        });

    let execution_id = orchestrator
        .create_execution(case.project_id, Some(case.id), &org, &ExecutionMetadata::default())
        .await
        .unwrap();

    let result = orchestrator
        .run(
            execution_id,
            &case,
            ExecutionContext::with_browser(driver.clone()),
            &executor,
            &governor(),
            &org,
        )
        .await
        .unwrap();

    assert_eq!(result, TestResult::Pass);
    assert_eq!(driver.call_count(), 3);
}

#[tokio::test]
async fn non_retryable_failure_is_not_retried() {
    let org = unique_org();
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let case = TestCaseBuilder::new("hard failure")
        .raw_step(StepDefinition::new("assert").with_target("#title"))
        .build();

    let driver = Arc::new(FlakyDriver::new(u32::MAX).with_error("assertion mismatch"));
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots))
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            ..RetryPolicy::for_driver()
        });

    let execution_id = orchestrator
        .create_execution(case.project_id, Some(case.id), &org, &ExecutionMetadata::default())
        .await
        .unwrap();

    let result = orchestrator
        .run(
            execution_id,
            &case,
            ExecutionContext::with_browser(driver.clone()),
            &executor,
            &governor(),
            &org,
        )
        .await
        .unwrap();

    assert_eq!(result, TestResult::Fail);
    // "assertion mismatch" matches no retryable keyword: one attempt only
    assert_eq!(driver.call_count(), 1);
}

#[tokio::test]
async fn suite_aggregation_over_mixed_members() {
    let org = unique_org();
    let store = Arc::new(MemoryStore::new());
    let (queue, mut rx) = LocalQueue::new();
    let suites = SuiteOrchestrator::new(store.clone(), Arc::new(queue));
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let project_id = Uuid::new_v4();
    let passing = TestCaseBuilder::new("passing")
        .project(project_id)
        .step("navigate", "https://ok")
        .build();
    let failing = TestCaseBuilder::new("failing")
        .project(project_id)
        .step("click", "#broken")
        .build();

    for case in [&passing, &failing] {
        store
            .create_test_case(&TestCaseModel::from_case(case, &org), &org)
            .await
            .unwrap();
    }

    let trigger = suites
        .trigger_suite(
            project_id,
            None,
            &[passing.id, failing.id],
            &org,
            &ExecutionMetadata::default(),
        )
        .await
        .unwrap();

    let driver = Arc::new(MockDriver::new().fail_on("#broken"));
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots))
        .with_retry_policy(RetryPolicy::no_retry());

    for _ in 0..2 {
        let message = rx.recv().await.unwrap();
        let case = store
            .get_test_case(message.test_case_id.unwrap(), &org)
            .await
            .unwrap()
            .into_case();
        orchestrator
            .run(
                message.execution_id,
                &case,
                ExecutionContext::with_browser(driver.clone()),
                &executor,
                &governor(),
                &org,
            )
            .await
            .unwrap();
    }

    let view = suites.status(trigger.suite_execution_id, &org).await.unwrap();
    assert_suite_consistent(&view);
    assert_eq!(view.status, canary_core::ExecutionStatus::Completed);
    assert_eq!(view.stats.passed, 1);
    assert_eq!(view.stats.failed, 1);
    assert_eq!(view.progress_percent, 100);
}
