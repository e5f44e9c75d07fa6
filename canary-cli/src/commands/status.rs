//! Check execution status

use anyhow::Context;
use canary_core::ExecutionStatus;
use canary_storage::{OrgId, PostgresStorage, RecordStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Print the status of an execution, optionally waiting for a terminal
/// status. Returns whether the final status is a clean completion.
pub async fn execute(
    execution_id: Uuid,
    wait: bool,
    timeout_secs: u64,
    poll_interval_secs: u64,
    org_id: &str,
    database_url: &str,
) -> anyhow::Result<bool> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn RecordStore> = Arc::new(storage);
    let org = OrgId::new(org_id);

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        let execution = store
            .get_execution(execution_id, &org)
            .await
            .context("Failed to load execution")?;

        let status = ExecutionStatus::try_from(execution.status.as_str())
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if status.is_terminal() || !wait {
            println!("Execution:  {}", execution.id);
            println!("Status:     {}", execution.status);
            println!(
                "Result:     {}",
                execution.result.as_deref().unwrap_or("-")
            );
            println!("Steps:      {}", execution.steps.0.len());
            if let Some(duration) = execution.duration() {
                println!("Duration:   {} ms", duration);
            }
            if let Some(message) = &execution.error_message {
                println!("Error:      {}", message);
            }

            let ok = match status {
                ExecutionStatus::Completed => execution.result.as_deref() == Some("pass"),
                ExecutionStatus::Error => false,
                // Still in flight and not waiting: nothing to judge
                _ => true,
            };
            return Ok(ok);
        }

        if Instant::now() >= deadline {
            anyhow::bail!(
                "Timed out after {}s waiting for execution {}",
                timeout_secs,
                execution_id
            );
        }

        tokio::time::sleep(Duration::from_secs(poll_interval_secs)).await;
    }
}
