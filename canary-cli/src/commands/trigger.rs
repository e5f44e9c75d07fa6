//! Trigger a test case or suite execution
//!
//! Creates the queued execution record(s) directly in storage; a running
//! worker picks them up from the queue.

use anyhow::Context;
use canary_core::ExecutionMetadata;
use canary_runtime::{ExecutionOrchestrator, SuiteOrchestrator};
use canary_storage::{OrgId, PostgresStorage, RecordStore};
use std::sync::Arc;
use uuid::Uuid;

pub async fn execute(
    project_id: Uuid,
    test_case_id: Option<Uuid>,
    test_suite_id: Option<Uuid>,
    triggered_by: &str,
    org_id: &str,
    database_url: &str,
) -> anyhow::Result<()> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn RecordStore> = Arc::new(storage);
    let org = OrgId::new(org_id);
    let metadata = ExecutionMetadata {
        triggered_by: Some(triggered_by.to_string()),
        environment: None,
    };

    match (test_case_id, test_suite_id) {
        (Some(test_case_id), None) => {
            let orchestrator = ExecutionOrchestrator::new(store);
            let execution_id = orchestrator
                .create_execution(project_id, Some(test_case_id), &org, &metadata)
                .await
                .context("Failed to create execution")?;

            println!("Execution queued: {}", execution_id);
        }
        (None, Some(test_suite_id)) => {
            let suite = store
                .get_test_suite(test_suite_id, &org)
                .await
                .context("Failed to load test suite")?;

            // The CLI only creates records; dispatch happens via the
            // worker's queue consumer. The receiver stays alive until the
            // trigger returns so enqueues succeed, then drains into the void.
            let (queue, _rx) = canary_runtime::LocalQueue::new();
            let suites = SuiteOrchestrator::new(store, Arc::new(queue));

            let trigger = suites
                .trigger_suite(project_id, Some(test_suite_id), &suite.case_ids.0, &org, &metadata)
                .await
                .context("Failed to trigger suite")?;

            println!("Suite execution: {}", trigger.suite_execution_id);
            for execution_id in trigger.execution_ids {
                println!("  member: {}", execution_id);
            }
        }
        _ => {
            anyhow::bail!("Specify exactly one of --test-case-id or --test-suite-id");
        }
    }

    Ok(())
}
