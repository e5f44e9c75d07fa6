//! Execution-time budgets
//!
//! Two layers of time governance: per-step timeouts (action-specific, in
//! milliseconds) and a whole-execution budget for bounded host runtimes.
//! A step that would not fit in the remaining budget is never started.

use canary_core::Action;
use std::time::{Duration, Instant};

/// Per-action step timeouts
#[derive(Debug, Clone)]
pub struct StepTimeouts {
    pub navigate: Duration,
    pub click: Duration,
    pub type_text: Duration,
    pub wait: Duration,
    pub assert: Duration,
    pub api_call: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            navigate: Duration::from_millis(30_000),
            click: Duration::from_millis(10_000),
            type_text: Duration::from_millis(10_000),
            wait: Duration::from_millis(30_000),
            assert: Duration::from_millis(10_000),
            api_call: Duration::from_millis(30_000),
        }
    }
}

impl StepTimeouts {
    /// Default timeout for an action
    pub fn for_action(&self, action: Action) -> Duration {
        match action {
            Action::Navigate => self.navigate,
            Action::Click => self.click,
            Action::Type => self.type_text,
            Action::Wait => self.wait,
            Action::Assert => self.assert,
            Action::ApiCall => self.api_call,
        }
    }
}

/// Governor for the whole-execution time budget
///
/// Inside a bounded host runtime (e.g. a worker invocation with a hard
/// wall-clock limit) the orchestrator checks the governor before each
/// step: when the remaining budget drops below `timeout_buffer +
/// min_step_window` the run is halted with an "insufficient time
/// remaining" condition instead of starting a step it cannot safely
/// finish or clean up after.
#[derive(Debug, Clone)]
pub struct BudgetGovernor {
    deadline: Instant,
    timeout_buffer: Duration,
    min_step_window: Duration,
}

impl BudgetGovernor {
    /// Governor with default margins (5s buffer, 1s minimum step window)
    pub fn new(total_budget: Duration) -> Self {
        Self::with_margins(
            total_budget,
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
    }

    /// Governor with explicit cleanup buffer and minimum step window
    pub fn with_margins(
        total_budget: Duration,
        timeout_buffer: Duration,
        min_step_window: Duration,
    ) -> Self {
        Self {
            deadline: Instant::now() + total_budget,
            timeout_buffer,
            min_step_window,
        }
    }

    /// Remaining budget, zero once the deadline has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Check that another step can safely start
    pub fn ensure_step_window(&self) -> crate::Result<()> {
        let remaining = self.remaining();
        let needed = self.timeout_buffer + self.min_step_window;
        if remaining < needed {
            return Err(crate::Error::InsufficientTime(format!(
                "insufficient time remaining in execution budget: {} ms left, {} ms required",
                remaining.as_millis(),
                needed.as_millis()
            )));
        }
        Ok(())
    }

    /// Clamp a step timeout so the step cannot outlive the budget
    ///
    /// The cleanup buffer is held back so a timed-out step still leaves
    /// room to record its failure.
    pub fn clamp_step_timeout(&self, timeout: Duration) -> Duration {
        let available = self.remaining().saturating_sub(self.timeout_buffer);
        timeout.min(available).max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_per_action() {
        let timeouts = StepTimeouts::default();
        assert_eq!(timeouts.for_action(Action::Navigate), Duration::from_millis(30_000));
        assert_eq!(timeouts.for_action(Action::Click), Duration::from_millis(10_000));
        assert_eq!(timeouts.for_action(Action::ApiCall), Duration::from_millis(30_000));
    }

    #[test]
    fn test_ample_budget_allows_steps() {
        let governor = BudgetGovernor::new(Duration::from_secs(60));
        assert!(governor.ensure_step_window().is_ok());
    }

    #[test]
    fn test_exhausted_budget_halts() {
        let governor = BudgetGovernor::with_margins(
            Duration::from_millis(50),
            Duration::from_millis(100),
            Duration::from_millis(100),
        );

        let err = governor.ensure_step_window().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("insufficient time remaining"), "{}", message);
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let governor = BudgetGovernor::with_margins(
            Duration::ZERO,
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        assert_eq!(governor.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_clamp_step_timeout() {
        let governor = BudgetGovernor::with_margins(
            Duration::from_secs(10),
            Duration::from_secs(2),
            Duration::from_secs(1),
        );

        // Far below the budget: unchanged
        assert_eq!(
            governor.clamp_step_timeout(Duration::from_secs(1)),
            Duration::from_secs(1)
        );

        // Above the available window: clamped under remaining - buffer
        let clamped = governor.clamp_step_timeout(Duration::from_secs(60));
        assert!(clamped <= Duration::from_secs(8));
        assert!(clamped >= Duration::from_secs(7));
    }
}
