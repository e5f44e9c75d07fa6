//! Step executor
//!
//! Runs the ordered steps of one test case against an execution context.
//! Steps execute strictly in order and the run stops at the first step
//! that does not pass; later steps are never attempted and never appear
//! in the result sequence. Individual action invocations are wrapped with
//! a per-step timeout and the retry executor.

use crate::budget::{BudgetGovernor, StepTimeouts};
use crate::driver::{ActionOutcome, AutomationDriver, ExecutionContext, ScreenshotStore};
use crate::metrics::STEP_DURATION_SECONDS;
use crate::retry::{retry_safe, RetryPolicy};
use canary_core::{Action, StepDefinition, StepResult, StepStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Outcome of executing a step sequence
#[derive(Debug)]
pub struct StepRun {
    /// Results for the steps that ran, in execution order
    pub steps: Vec<StepResult>,

    /// Set when the budget governor halted the run before all steps were
    /// attempted; carries the "insufficient time remaining" diagnostic.
    pub halted: Option<String>,
}

impl StepRun {
    /// Screenshot references captured during the run, in step order
    pub fn screenshots(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|s| s.screenshot.clone())
            .collect()
    }
}

/// Executes the ordered steps of a test case
pub struct StepExecutor {
    /// Driver used for `api-call` steps, which never need the browser
    api_driver: Arc<dyn AutomationDriver>,
    screenshots: Arc<dyn ScreenshotStore>,
    timeouts: StepTimeouts,
    retry_policy: RetryPolicy,
}

impl StepExecutor {
    pub fn new(
        api_driver: Arc<dyn AutomationDriver>,
        screenshots: Arc<dyn ScreenshotStore>,
    ) -> Self {
        Self {
            api_driver,
            screenshots,
            timeouts: StepTimeouts::default(),
            retry_policy: RetryPolicy::for_driver(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StepTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Execute the steps of one test case
    ///
    /// Never raises for ordinary action failure; failures become `fail` or
    /// `error` step results. The only early exit is the budget governor
    /// halting the run, reported via [`StepRun::halted`].
    #[instrument(
        skip(self, ctx, steps, governor),
        fields(execution_id = %execution_id, step_count = steps.len())
    )]
    pub async fn execute_steps(
        &self,
        ctx: &ExecutionContext,
        steps: &[StepDefinition],
        governor: &BudgetGovernor,
        execution_id: Uuid,
    ) -> StepRun {
        let mut results = Vec::with_capacity(steps.len());

        for (index, definition) in steps.iter().enumerate() {
            let index = index as u32;

            if let Err(e) = governor.ensure_step_window() {
                warn!(step_index = index, error = %e, "Halting run before step");
                return StepRun {
                    steps: results,
                    halted: Some(e.to_string()),
                };
            }

            let result = self.execute_step(ctx, definition, governor, execution_id, index).await;
            let stop = result.status != StepStatus::Pass;
            results.push(result);

            if stop {
                break;
            }
        }

        StepRun {
            steps: results,
            halted: None,
        }
    }

    /// Execute one step, including retry and screenshot capture
    async fn execute_step(
        &self,
        ctx: &ExecutionContext,
        definition: &StepDefinition,
        governor: &BudgetGovernor,
        execution_id: Uuid,
        index: u32,
    ) -> StepResult {
        // Unknown actions are a configuration defect: report and never retry.
        let action = match definition.resolve_action() {
            Ok(action) => action,
            Err(e) => {
                warn!(step_index = index, error = %e, "Unresolvable step action");
                return StepResult::error(index, definition.action.clone(), 0, e.to_string());
            }
        };

        // UI actions need a live browser session; fail without invoking
        // the handler when there is none. api-call runs either way.
        let driver = if action.requires_browser() {
            match ctx.browser() {
                Some(browser) => browser.clone(),
                None => {
                    return StepResult::fail(
                        index,
                        action.as_str(),
                        0,
                        format!(
                            "No browser session available for UI action '{}'",
                            action
                        ),
                    );
                }
            }
        } else {
            self.api_driver.clone()
        };

        let timeout = governor.clamp_step_timeout(
            definition
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| self.timeouts.for_action(action)),
        );
        let timeout_ms = timeout.as_millis() as u64;
        let target = definition.target.clone();
        let value = definition.value.clone();

        debug!(
            step_index = index,
            action = %action,
            timeout_ms,
            "Executing step"
        );

        let start = Instant::now();
        let outcome = retry_safe(&self.retry_policy, || {
            let driver = driver.clone();
            let target = target.clone();
            let value = value.clone();
            async move {
                Self::attempt(driver, action, target, value, timeout, timeout_ms).await
            }
        })
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut result = match (outcome.value, outcome.error) {
            (Some(action_outcome), _) => {
                let mut result = StepResult::pass(index, action.as_str(), duration_ms);
                result.details = action_outcome.details;
                result
            }
            (None, Some(message)) => {
                warn!(
                    step_index = index,
                    action = %action,
                    attempts = outcome.attempts,
                    error = %message,
                    "Step failed"
                );
                StepResult::fail(index, action.as_str(), duration_ms, message)
            }
            // retry_safe always reports one of the two
            (None, None) => StepResult::fail(
                index,
                action.as_str(),
                duration_ms,
                "step failed without diagnostic".to_string(),
            ),
        };

        STEP_DURATION_SECONDS
            .with_label_values(&[action.as_str(), result.status.as_str()])
            .observe(start.elapsed().as_secs_f64());

        // Best-effort screenshot for failed UI steps; absence is fine,
        // a crash is not. The store itself never raises.
        if result.status == StepStatus::Fail && action.requires_browser() {
            result.screenshot = self
                .screenshots
                .capture_and_store(execution_id, index)
                .await;
        }

        result
    }

    /// One driver invocation, guarded by the per-step timeout
    ///
    /// A timeout produces the load-bearing "timed out" message naming the
    /// action and the configured limit in milliseconds; downstream retry
    /// classification matches on it.
    async fn attempt(
        driver: Arc<dyn AutomationDriver>,
        action: Action,
        target: Option<String>,
        value: Option<String>,
        timeout: Duration,
        timeout_ms: u64,
    ) -> Result<ActionOutcome, String> {
        let invocation = driver.execute(action, target.as_deref(), value.as_deref(), timeout);

        match tokio::time::timeout(timeout, invocation).await {
            Ok(outcome) if outcome.success => Ok(outcome),
            Ok(outcome) => Err(outcome
                .error
                .unwrap_or_else(|| format!("Action '{}' failed without diagnostic", action))),
            Err(_) => Err(format!(
                "Action '{}' timed out after {} ms",
                action, timeout_ms
            )),
        }
    }
}
