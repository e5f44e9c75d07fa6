//! Derived status of a suite execution

use anyhow::Context;
use canary_runtime::suite::summarize;
use canary_storage::{OrgId, PostgresStorage, RecordStore};
use std::sync::Arc;
use uuid::Uuid;

pub async fn execute(
    suite_execution_id: Uuid,
    org_id: &str,
    database_url: &str,
) -> anyhow::Result<()> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn RecordStore> = Arc::new(storage);
    let org = OrgId::new(org_id);

    let members = store
        .list_suite_members(suite_execution_id, &org)
        .await
        .context("Failed to load suite members")?;
    if members.is_empty() {
        anyhow::bail!("Suite execution {} not found", suite_execution_id);
    }

    let view = summarize(suite_execution_id, &members)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("Suite execution: {}", view.suite_execution_id);
    println!("Status:          {}", view.status);
    println!("Progress:        {}%", view.progress_percent);
    println!(
        "Stats:           {} total, {} passed, {} failed, {} errors",
        view.stats.total, view.stats.passed, view.stats.failed, view.stats.errors
    );
    if let Some(duration) = view.duration_ms {
        println!("Duration:        {} ms", duration);
    }

    Ok(())
}
