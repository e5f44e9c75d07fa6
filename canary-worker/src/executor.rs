//! Case execution engine with host timeout enforcement
//!
//! Drives one queue-delivered execution end to end: loads the test case,
//! builds the time-budget governor from the configured host limit, runs
//! the orchestrator under a hard wall-clock guard, and records timeouts
//! as terminal failures.

use crate::types::TaskPayload;
use canary_runtime::{
    AutomationDriver, BudgetGovernor, ExecutionContext, ExecutionOrchestrator, ScreenshotStore,
    StepExecutor,
};
use canary_storage::{OrgId, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Errors that can occur while driving an execution
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("State transition failed: {0}")]
    StateTransition(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Runs queue-delivered test case executions
pub struct CaseExecutor {
    store: Arc<dyn RecordStore>,
    orchestrator: ExecutionOrchestrator,
    driver: Arc<dyn AutomationDriver>,
    screenshots: Arc<dyn ScreenshotStore>,
    timeout: Duration,
    timeout_buffer: Duration,
    min_step_window: Duration,
}

impl CaseExecutor {
    /// Create a new case executor
    ///
    /// # Arguments
    ///
    /// * `store` - execution record storage
    /// * `driver` - automation driver session source
    /// * `screenshots` - artifact store for failed UI steps
    /// * `timeout` - hard wall-clock limit per execution
    pub fn new(
        store: Arc<dyn RecordStore>,
        driver: Arc<dyn AutomationDriver>,
        screenshots: Arc<dyn ScreenshotStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            orchestrator: ExecutionOrchestrator::new(store.clone()),
            store,
            driver,
            screenshots,
            timeout,
            timeout_buffer: Duration::from_secs(5),
            min_step_window: Duration::from_secs(1),
        }
    }

    /// Override the budget governor margins
    pub fn with_margins(mut self, timeout_buffer: Duration, min_step_window: Duration) -> Self {
        self.timeout_buffer = timeout_buffer;
        self.min_step_window = min_step_window;
        self
    }

    /// Execute one queue-delivered task
    ///
    /// Completing with a failed or errored test result is a successful
    /// invocation; an error return means the execution record itself
    /// could not be driven.
    #[instrument(
        skip(self, payload),
        fields(
            execution_id = %payload.execution_id,
            test_case_id = ?payload.test_case_id,
            org_id = %payload.organization_id,
        )
    )]
    pub async fn execute(&self, payload: TaskPayload) -> Result<(), ExecutionError> {
        let org = OrgId::new(&payload.organization_id);

        let test_case_id = match payload.test_case_id {
            Some(id) => id,
            None => {
                let message = "task payload names no test case";
                warn!(message);
                return self.fail_execution(&payload, message, &org).await;
            }
        };

        let case = match self.store.get_test_case(test_case_id, &org).await {
            Ok(model) => model.into_case(),
            Err(e) => {
                let message = format!("failed to load test case: {}", e);
                error!(error = %message);
                return self.fail_execution(&payload, &message, &org).await;
            }
        };

        info!(
            test_case = %case.name,
            step_count = case.steps.len(),
            timeout_seconds = self.timeout.as_secs(),
            "Starting execution"
        );

        let governor =
            BudgetGovernor::with_margins(self.timeout, self.timeout_buffer, self.min_step_window);
        let executor = StepExecutor::new(self.driver.clone(), self.screenshots.clone());
        let ctx = ExecutionContext::with_browser(self.driver.clone());

        // Hard wall-clock guard on top of the budget governor: even a
        // hung driver cannot keep the record in `running` forever.
        let run = tokio::select! {
            result = self.orchestrator.run(
                payload.execution_id,
                &case,
                ctx,
                &executor,
                &governor,
                &org,
            ) => result.map(Some),
            _ = tokio::time::sleep(self.timeout) => {
                warn!(timeout_seconds = self.timeout.as_secs(), "Execution wall-clock limit exceeded");
                Ok(None)
            }
        };

        match run {
            Ok(Some(result)) => {
                info!(result = %result, "Execution finished");
                Ok(())
            }
            Ok(None) => {
                let message = format!(
                    "Execution timed out after {} ms",
                    self.timeout.as_millis()
                );
                self.orchestrator
                    .record_failure(payload.execution_id, &message, &org)
                    .await
                    .map_err(|e| ExecutionError::StateTransition(e.to_string()))?;
                Err(ExecutionError::Timeout(self.timeout))
            }
            Err(e) => {
                error!(error = %e, "Execution failed to run");
                Err(ExecutionError::Internal(e.to_string()))
            }
        }
    }

    /// Record a pre-run failure against the execution record
    async fn fail_execution(
        &self,
        payload: &TaskPayload,
        message: &str,
        org: &OrgId,
    ) -> Result<(), ExecutionError> {
        self.orchestrator
            .record_failure(payload.execution_id, message, org)
            .await
            .map_err(|e| ExecutionError::StateTransition(e.to_string()))?;
        Ok(())
    }
}
