//! Query execution history

use anyhow::Context;
use canary_storage::{ExecutionQuery, OrgId, PostgresStorage, RecordStore};
use std::sync::Arc;
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    project_id: Option<Uuid>,
    test_case_id: Option<Uuid>,
    test_suite_id: Option<Uuid>,
    suite_execution_id: Option<Uuid>,
    limit: i64,
    org_id: &str,
    database_url: &str,
) -> anyhow::Result<()> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn RecordStore> = Arc::new(storage);
    let org = OrgId::new(org_id);

    let query = ExecutionQuery {
        project_id,
        test_case_id,
        test_suite_id,
        suite_execution_id,
        created_after: None,
        created_before: None,
        limit: Some(limit),
    };

    let executions = store
        .query_executions(&query, &org)
        .await
        .context("Failed to query executions")?;

    if executions.is_empty() {
        println!("No executions found");
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:<7} {:<24} {:>8}",
        "EXECUTION", "STATUS", "RESULT", "CREATED", "STEPS"
    );
    for execution in executions {
        println!(
            "{:<38} {:<10} {:<7} {:<24} {:>8}",
            execution.id,
            execution.status,
            execution.result.as_deref().unwrap_or("-"),
            execution.created_at.format("%Y-%m-%d %H:%M:%S"),
            execution.steps.0.len(),
        );
    }

    Ok(())
}
