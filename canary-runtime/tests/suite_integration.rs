//! Integration tests for suite fan-out and aggregation
//!
//! Drives a full suite trigger through the local queue, runs each member
//! through the orchestrator, and checks the derived suite view at each
//! stage.

use async_trait::async_trait;
use canary_core::{Action, ExecutionMetadata, StepDefinition, TestCase};
use canary_runtime::{
    ActionOutcome, AutomationDriver, BudgetGovernor, ExecutionContext, ExecutionOrchestrator,
    LocalQueue, RetryPolicy, StepExecutor, SuiteOrchestrator,
};
use canary_storage::{MemoryStore, OrgId, RecordStore, TestCaseModel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Driver that fails every step of the test cases named in `failing`
struct PerCaseDriver {
    failing_urls: Vec<String>,
}

#[async_trait]
impl AutomationDriver for PerCaseDriver {
    async fn execute(
        &self,
        _action: Action,
        target: Option<&str>,
        _value: Option<&str>,
        _timeout: Duration,
    ) -> ActionOutcome {
        match target {
            Some(target) if self.failing_urls.iter().any(|u| u == target) => {
                ActionOutcome::failed("page failed to load")
            }
            _ => ActionOutcome::ok(),
        }
    }
}

struct NullScreenshots;

#[async_trait]
impl canary_runtime::ScreenshotStore for NullScreenshots {
    async fn capture_and_store(&self, _execution_id: Uuid, _step_index: u32) -> Option<String> {
        None
    }
}

fn org() -> OrgId {
    OrgId::new("org-suite")
}

fn single_step_case(project_id: Uuid, url: &str) -> TestCase {
    TestCase::new(project_id, format!("case {}", url))
        .with_steps(vec![StepDefinition::new("navigate").with_target(url)])
}

#[tokio::test]
async fn suite_runs_members_and_aggregates() {
    let store = Arc::new(MemoryStore::new());
    let (queue, mut rx) = LocalQueue::new();
    let suite_orchestrator = SuiteOrchestrator::new(store.clone(), Arc::new(queue));
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let project_id = Uuid::new_v4();
    let urls = ["https://ok-1", "https://ok-2", "https://broken"];
    let mut cases = HashMap::new();
    for url in urls {
        let case = single_step_case(project_id, url);
        store
            .create_test_case(&TestCaseModel::from_case(&case, &org()), &org())
            .await
            .unwrap();
        cases.insert(case.id, case);
    }
    let case_ids: Vec<Uuid> = cases.keys().copied().collect();

    let trigger = suite_orchestrator
        .trigger_suite(
            project_id,
            None,
            &case_ids,
            &org(),
            &ExecutionMetadata {
                triggered_by: Some("schedule:nightly".to_string()),
                environment: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(trigger.execution_ids.len(), 3);

    // Nothing has run yet: the suite is running at 0%
    let view = suite_orchestrator
        .status(trigger.suite_execution_id, &org())
        .await
        .unwrap();
    assert_eq!(view.status, canary_core::ExecutionStatus::Running);
    assert_eq!(view.progress_percent, 0);

    // Consume the queue like a worker would: load the case, run it
    let driver = Arc::new(PerCaseDriver {
        failing_urls: vec!["https://broken".to_string()],
    });
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots))
        .with_retry_policy(RetryPolicy::no_retry());

    for _ in 0..3 {
        let message = rx.recv().await.unwrap();
        let case = store
            .get_test_case(message.test_case_id.unwrap(), &org())
            .await
            .unwrap()
            .into_case();

        orchestrator
            .run(
                message.execution_id,
                &case,
                ExecutionContext::with_browser(driver.clone()),
                &executor,
                &BudgetGovernor::new(Duration::from_secs(60)),
                &org(),
            )
            .await
            .unwrap();
    }

    let view = suite_orchestrator
        .status(trigger.suite_execution_id, &org())
        .await
        .unwrap();
    assert_eq!(view.status, canary_core::ExecutionStatus::Completed);
    assert_eq!(view.progress_percent, 100);
    assert_eq!(view.stats.total, 3);
    assert_eq!(view.stats.passed, 2);
    assert_eq!(view.stats.failed, 1);
    assert_eq!(view.stats.errors, 0);
    assert_eq!(
        view.stats.passed + view.stats.failed + view.stats.errors,
        view.stats.total
    );
    assert!(view.started_at.is_some());
    assert!(view.completed_at.is_some());
    assert!(view.duration_ms.unwrap_or(-1) >= 0);
}

#[tokio::test]
async fn one_failing_member_does_not_block_siblings() {
    let store = Arc::new(MemoryStore::new());
    let (queue, mut rx) = LocalQueue::new();
    let suite_orchestrator = SuiteOrchestrator::new(store.clone(), Arc::new(queue));
    let orchestrator = ExecutionOrchestrator::new(store.clone());

    let project_id = Uuid::new_v4();
    // One member references a case that was never stored: its run errors
    let stored_case = single_step_case(project_id, "https://ok");
    store
        .create_test_case(&TestCaseModel::from_case(&stored_case, &org()), &org())
        .await
        .unwrap();
    let missing_case_id = Uuid::new_v4();

    let trigger = suite_orchestrator
        .trigger_suite(
            project_id,
            None,
            &[stored_case.id, missing_case_id],
            &org(),
            &ExecutionMetadata::default(),
        )
        .await
        .unwrap();

    let driver = Arc::new(PerCaseDriver {
        failing_urls: vec![],
    });
    let executor = StepExecutor::new(driver.clone(), Arc::new(NullScreenshots))
        .with_retry_policy(RetryPolicy::no_retry());

    for _ in 0..2 {
        let message = rx.recv().await.unwrap();
        match store.get_test_case(message.test_case_id.unwrap(), &org()).await {
            Ok(case) => {
                orchestrator
                    .run(
                        message.execution_id,
                        &case.into_case(),
                        ExecutionContext::with_browser(driver.clone()),
                        &executor,
                        &BudgetGovernor::new(Duration::from_secs(60)),
                        &org(),
                    )
                    .await
                    .unwrap();
            }
            Err(e) => {
                orchestrator
                    .record_failure(message.execution_id, &e.to_string(), &org())
                    .await
                    .unwrap();
            }
        }
    }

    let view = suite_orchestrator
        .status(trigger.suite_execution_id, &org())
        .await
        .unwrap();
    // The healthy member still completed; the suite is in error overall
    assert_eq!(view.status, canary_core::ExecutionStatus::Error);
    assert_eq!(view.stats.passed, 1);
    assert_eq!(view.stats.errors, 1);
    assert_eq!(view.progress_percent, 100);
}
