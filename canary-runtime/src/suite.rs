//! Suite orchestrator
//!
//! Fans a suite trigger out into independent single executions sharing a
//! fresh `suite_execution_id`, and derives the aggregate suite view from
//! the member records. Aggregation is read-only: member records are never
//! mutated here.

use crate::metrics::SUITE_TRIGGER_TOTAL;
use crate::queue::{ExecutionMessage, ExecutionQueue};
use canary_core::{ExecutionMetadata, ExecutionStatus};
use canary_storage::{ExecutionModel, OrgId, RecordStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Result of a suite trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteTrigger {
    pub suite_execution_id: Uuid,
    pub execution_ids: Vec<Uuid>,
}

/// Aggregate statistics over suite members
///
/// `passed + failed + errors == total` always holds: passed/failed count
/// member results, errors counts member `error` statuses (an errored
/// execution may have no result at all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub duration_ms: i64,
}

/// Derived aggregate view over the members of one suite execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteExecution {
    pub suite_execution_id: Uuid,
    pub status: ExecutionStatus,
    pub stats: SuiteStats,
    pub progress_percent: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

/// Derive the suite status from member statuses
///
/// Any non-terminal member makes the suite `running`; otherwise any
/// `error` member makes it `error`; otherwise `completed`.
pub fn derive_suite_status(statuses: &[ExecutionStatus]) -> ExecutionStatus {
    if statuses.iter().any(|s| !s.is_terminal()) {
        ExecutionStatus::Running
    } else if statuses.iter().any(|s| *s == ExecutionStatus::Error) {
        ExecutionStatus::Error
    } else {
        ExecutionStatus::Completed
    }
}

/// Share of members with terminal status, in percent
///
/// Always in `[0, 100]`; 100 iff all members are terminal. An empty
/// member set reads as fully terminal, matching the derived status.
pub fn progress_percent(statuses: &[ExecutionStatus]) -> u8 {
    if statuses.is_empty() {
        return 100;
    }
    let terminal = statuses.iter().filter(|s| s.is_terminal()).count();
    (100 * terminal / statuses.len()) as u8
}

/// Aggregate member statistics
pub fn suite_stats(members: &[ExecutionModel]) -> SuiteStats {
    let passed = members
        .iter()
        .filter(|m| m.result.as_deref() == Some("pass"))
        .count();
    let failed = members
        .iter()
        .filter(|m| m.result.as_deref() == Some("fail"))
        .count();
    let errors = members.iter().filter(|m| m.status == "error").count();
    let duration_ms = members.iter().filter_map(|m| m.duration()).sum();

    SuiteStats {
        total: members.len(),
        passed,
        failed,
        errors,
        duration_ms,
    }
}

/// Suite timing window: earliest member start, latest member end among
/// members that report one, and the derived duration (absent rather than
/// negative).
pub fn suite_window(
    members: &[ExecutionModel],
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<i64>) {
    let started_at = members.iter().map(|m| m.started_at).min();
    let completed_at = members.iter().filter_map(|m| m.completed_at).max();

    let duration_ms = match (started_at, completed_at) {
        (Some(start), Some(end)) => {
            let delta = end.signed_duration_since(start).num_milliseconds();
            if delta >= 0 {
                Some(delta)
            } else {
                None
            }
        }
        _ => None,
    };

    (started_at, completed_at, duration_ms)
}

/// Build the derived suite view from member records
pub fn summarize(
    suite_execution_id: Uuid,
    members: &[ExecutionModel],
) -> crate::Result<SuiteExecution> {
    let statuses = members
        .iter()
        .map(|m| {
            m.current_status()
                .map_err(|e| crate::Error::Internal(e.to_string()))
        })
        .collect::<crate::Result<Vec<_>>>()?;

    let (started_at, completed_at, duration_ms) = suite_window(members);

    Ok(SuiteExecution {
        suite_execution_id,
        status: derive_suite_status(&statuses),
        stats: suite_stats(members),
        progress_percent: progress_percent(&statuses),
        started_at,
        completed_at,
        duration_ms,
    })
}

/// Fans suite triggers out into independent member executions
#[derive(Clone)]
pub struct SuiteOrchestrator {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn ExecutionQueue>,
}

impl SuiteOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, queue: Arc<dyn ExecutionQueue>) -> Self {
        Self { store, queue }
    }

    /// Trigger a suite run over the given test cases
    ///
    /// Every member gets its own freshly generated execution ID and is
    /// enqueued as one independent unit of work; nothing executes inside
    /// the trigger path, and a failing member dispatch never blocks or
    /// alters its siblings. An empty case set is a caller defect.
    #[instrument(
        skip(self, case_ids, metadata, org),
        fields(
            project_id = %project_id,
            case_count = case_ids.len(),
            org_id = %org.as_str(),
        )
    )]
    pub async fn trigger_suite(
        &self,
        project_id: Uuid,
        test_suite_id: Option<Uuid>,
        case_ids: &[Uuid],
        org: &OrgId,
        metadata: &ExecutionMetadata,
    ) -> crate::Result<SuiteTrigger> {
        if case_ids.is_empty() {
            SUITE_TRIGGER_TOTAL.with_label_values(&["failure"]).inc();
            return Err(crate::Error::Execution(
                "no test cases in suite".to_string(),
            ));
        }

        let suite_execution_id = Uuid::new_v4();
        let mut execution_ids = Vec::with_capacity(case_ids.len());

        for case_id in case_ids {
            let execution = ExecutionModel::queued(project_id, Some(*case_id), org, metadata)
                .in_suite(test_suite_id, suite_execution_id);
            let execution_id = execution.id;

            if let Err(e) = self.store.create_execution(&execution, org).await {
                // One member's failure must not block its siblings
                error!(
                    test_case_id = %case_id,
                    error = %e,
                    "Failed to create suite member execution"
                );
                continue;
            }

            if let Err(e) = self
                .queue
                .enqueue(ExecutionMessage {
                    execution_id,
                    test_case_id: Some(*case_id),
                    project_id,
                    organization_id: org.as_str().to_string(),
                    suite_execution_id: Some(suite_execution_id),
                })
                .await
            {
                error!(
                    execution_id = %execution_id,
                    error = %e,
                    "Failed to enqueue suite member"
                );
                // Best effort: leave the member in a terminal error state
                if let Err(record_err) = self
                    .store
                    .update_status(
                        execution_id,
                        ExecutionStatus::Queued,
                        ExecutionStatus::Error,
                        Some(&format!("Failed to enqueue: {}", e)),
                        org,
                    )
                    .await
                {
                    warn!(
                        execution_id = %execution_id,
                        error = %record_err,
                        "Failed to record enqueue failure"
                    );
                }
            }

            execution_ids.push(execution_id);
        }

        if execution_ids.is_empty() {
            SUITE_TRIGGER_TOTAL.with_label_values(&["failure"]).inc();
            return Err(crate::Error::Internal(
                "failed to create any suite member execution".to_string(),
            ));
        }

        SUITE_TRIGGER_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(
            suite_execution_id = %suite_execution_id,
            members = execution_ids.len(),
            "Suite triggered"
        );

        Ok(SuiteTrigger {
            suite_execution_id,
            execution_ids,
        })
    }

    /// Current derived view of a suite execution
    #[instrument(skip(self, org), fields(suite_execution_id = %suite_execution_id, org_id = %org.as_str()))]
    pub async fn status(
        &self,
        suite_execution_id: Uuid,
        org: &OrgId,
    ) -> crate::Result<SuiteExecution> {
        let members = self
            .store
            .list_suite_members(suite_execution_id, org)
            .await
            .map_err(|e| crate::Error::Internal(e.to_string()))?;

        if members.is_empty() {
            return Err(crate::Error::NotFound(format!(
                "Suite execution {}",
                suite_execution_id
            )));
        }

        summarize(suite_execution_id, &members)
    }
}
