//! Single-execution orchestrator
//!
//! Composes the step executor, the budget governor and the status state
//! machine to run one test case end to end. The orchestrator owns the
//! execution record while the run is in progress; every status write goes
//! through the conditional transition gate so a record that moved
//! underneath a writer is never clobbered.

use crate::budget::BudgetGovernor;
use crate::driver::ExecutionContext;
use crate::metrics::{EXECUTION_CREATE_TOTAL, EXECUTION_STATE_TRANSITION_TOTAL};
use crate::queue::{ExecutionMessage, ExecutionQueue};
use crate::step_executor::{StepExecutor, StepRun};
use canary_core::{
    determine_result, is_valid_transition, ExecutionMetadata, ExecutionStatus, TestCase, TestResult,
};
use canary_storage::{ExecutionModel, OrgId, RecordStore};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Stateless orchestrator for single test case executions
///
/// Thread-safe and cheap to clone; all state lives in the record store.
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    store: Arc<dyn RecordStore>,
    queue: Option<Arc<dyn ExecutionQueue>>,
}

impl ExecutionOrchestrator {
    /// Create a new orchestrator without a dispatch queue
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store, queue: None }
    }

    /// Create a new orchestrator that enqueues created executions
    pub fn with_queue(store: Arc<dyn RecordStore>, queue: Arc<dyn ExecutionQueue>) -> Self {
        Self {
            store,
            queue: Some(queue),
        }
    }

    /// Map storage errors to runtime domain errors
    ///
    /// Preserves semantic meaning so callers can distinguish missing
    /// records, stale-status conflicts and infrastructure failures.
    fn map_storage_error(e: canary_storage::Error, context: &str) -> crate::Error {
        use canary_storage::Error as StorageError;

        match e {
            StorageError::NotFound(msg) => crate::Error::NotFound(msg),
            StorageError::InvalidTransition(msg) => crate::Error::InvalidState(msg),
            StorageError::Conflict(msg) => crate::Error::Conflict(msg),
            StorageError::InvalidQuery(msg) => crate::Error::Execution(msg),
            StorageError::AlreadyExists(msg) => crate::Error::Execution(msg),
            other => {
                let msg = format!("{}: {}", context, other);
                error!(error = %msg, "Storage error");
                crate::Error::Internal(msg)
            }
        }
    }

    /// Create a `queued` execution record for a test case
    ///
    /// When a queue is configured the execution is also dispatched as one
    /// independent unit of work; nothing executes inside the trigger path.
    #[instrument(
        skip(self, metadata, org),
        fields(project_id = %project_id, test_case_id = ?test_case_id, org_id = %org.as_str())
    )]
    pub async fn create_execution(
        &self,
        project_id: Uuid,
        test_case_id: Option<Uuid>,
        org: &OrgId,
        metadata: &ExecutionMetadata,
    ) -> crate::Result<Uuid> {
        let execution = ExecutionModel::queued(project_id, test_case_id, org, metadata);
        let execution_id = execution.id;

        if let Err(e) = self.store.create_execution(&execution, org).await {
            EXECUTION_CREATE_TOTAL.with_label_values(&["failure"]).inc();
            return Err(Self::map_storage_error(e, "Failed to create execution"));
        }
        EXECUTION_CREATE_TOTAL.with_label_values(&["success"]).inc();
        tracing::debug!(execution_id = %execution_id, "Execution created");

        if let Some(queue) = &self.queue {
            let message = ExecutionMessage {
                execution_id,
                test_case_id,
                project_id,
                organization_id: org.as_str().to_string(),
                suite_execution_id: None,
            };

            if let Err(e) = queue.enqueue(message).await {
                error!(
                    execution_id = %execution_id,
                    error = %e,
                    "Failed to enqueue execution"
                );
                // Best effort: the record should not stay queued forever
                if let Err(record_err) = self
                    .record_failure(execution_id, &format!("Failed to enqueue: {}", e), org)
                    .await
                {
                    warn!(
                        execution_id = %execution_id,
                        error = %record_err,
                        "Failed to record enqueue failure"
                    );
                }
                return Err(crate::Error::Enqueue(e.to_string()));
            }
        }

        Ok(execution_id)
    }

    /// Transition an execution's status
    ///
    /// Validates the edge against the transition table, then performs the
    /// conditional store update, which re-checks the persisted status at
    /// write time. Invalid transitions never touch the record.
    #[instrument(
        skip(self, org),
        fields(
            execution_id = %execution_id,
            from_status = %from,
            to_status = %to,
            org_id = %org.as_str(),
        )
    )]
    pub async fn transition_status(
        &self,
        execution_id: Uuid,
        from: ExecutionStatus,
        to: ExecutionStatus,
        org: &OrgId,
    ) -> crate::Result<()> {
        if !is_valid_transition(from, to) {
            EXECUTION_STATE_TRANSITION_TOTAL
                .with_label_values(&[from.as_str(), to.as_str(), "failure"])
                .inc();
            return Err(crate::Error::InvalidState(format!(
                "Invalid status transition from {} to {}",
                from, to
            )));
        }

        match self
            .store
            .update_status(execution_id, from, to, None, org)
            .await
        {
            Ok(()) => {
                EXECUTION_STATE_TRANSITION_TOTAL
                    .with_label_values(&[from.as_str(), to.as_str(), "success"])
                    .inc();
                tracing::debug!(new_status = %to, "Status transition complete");
                Ok(())
            }
            Err(e) => {
                EXECUTION_STATE_TRANSITION_TOTAL
                    .with_label_values(&[from.as_str(), to.as_str(), "failure"])
                    .inc();
                Err(Self::map_storage_error(e, "Failed to transition status"))
            }
        }
    }

    /// Record an execution-level failure
    ///
    /// Transitions the record to the terminal `error` status with the
    /// message; a record that is already terminal is left untouched and
    /// the attempt rejected.
    #[instrument(skip(self, message, org), fields(execution_id = %execution_id, org_id = %org.as_str()))]
    pub async fn record_failure(
        &self,
        execution_id: Uuid,
        message: &str,
        org: &OrgId,
    ) -> crate::Result<()> {
        let current = self
            .store
            .get_execution(execution_id, org)
            .await
            .map_err(|e| Self::map_storage_error(e, "Failed to get execution"))?;

        let current_status = current
            .current_status()
            .map_err(|e| Self::map_storage_error(e, "Failed to read status"))?;

        if current_status.is_terminal() {
            return Err(crate::Error::InvalidState(format!(
                "Cannot record failure: execution {} is already {}",
                execution_id, current_status
            )));
        }

        self.store
            .update_status(
                execution_id,
                current_status,
                ExecutionStatus::Error,
                Some(message),
                org,
            )
            .await
            .map_err(|e| Self::map_storage_error(e, "Failed to record failure"))
    }

    /// Run one test case end to end
    ///
    /// Transitions queued → running, executes the steps under the budget
    /// governor, persists step results and the determined result, and
    /// takes the terminal transition. The browser handle in the context
    /// is released on every path out of this function.
    #[instrument(
        skip(self, case, ctx, executor, governor, org),
        fields(
            execution_id = %execution_id,
            test_case = %case.name,
            step_count = case.steps.len(),
            org_id = %org.as_str(),
        )
    )]
    pub async fn run(
        &self,
        execution_id: Uuid,
        case: &TestCase,
        mut ctx: ExecutionContext,
        executor: &StepExecutor,
        governor: &BudgetGovernor,
        org: &OrgId,
    ) -> crate::Result<TestResult> {
        if let Err(e) = self
            .transition_status(
                execution_id,
                ExecutionStatus::Queued,
                ExecutionStatus::Running,
                org,
            )
            .await
        {
            ctx.close().await;
            return Err(e);
        }

        let run = executor
            .execute_steps(&ctx, &case.steps, governor, execution_id)
            .await;
        ctx.close().await;

        self.finish(execution_id, run, org).await
    }

    /// Persist the outcome of a finished step run and take the terminal
    /// transition
    async fn finish(
        &self,
        execution_id: Uuid,
        run: StepRun,
        org: &OrgId,
    ) -> crate::Result<TestResult> {
        let screenshots = run.screenshots();

        let (result, error_message) = match &run.halted {
            Some(message) => (TestResult::Error, Some(message.clone())),
            None => {
                let result = determine_result(&run.steps);
                let message = match result {
                    TestResult::Pass => None,
                    _ if run.steps.is_empty() => {
                        Some("no steps were executed".to_string())
                    }
                    _ => run.steps.iter().rev().find_map(|s| s.error_message.clone()),
                };
                (result, message)
            }
        };

        self.store
            .update_results(
                execution_id,
                &run.steps,
                result,
                &screenshots,
                error_message.as_deref(),
                org,
            )
            .await
            .map_err(|e| Self::map_storage_error(e, "Failed to record results"))?;

        let terminal = match result {
            TestResult::Pass | TestResult::Fail => ExecutionStatus::Completed,
            TestResult::Error => ExecutionStatus::Error,
        };
        self.transition_status(execution_id, ExecutionStatus::Running, terminal, org)
            .await?;

        tracing::debug!(result = %result, "Execution finished");
        Ok(result)
    }
}
