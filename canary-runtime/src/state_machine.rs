//! Execution state machine

use canary_core::{is_valid_transition, ExecutionStatus};
use chrono::{DateTime, Utc};

/// State machine tracking the status lifecycle of one execution
///
/// The transition table lives in [`canary_core::status::is_valid_transition`];
/// this type adds the current-status bookkeeping and a timestamped history.
pub struct StateMachine {
    current: ExecutionStatus,
    history: Vec<(ExecutionStatus, DateTime<Utc>)>,
}

impl StateMachine {
    /// Create a new state machine in the `queued` status
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            current: ExecutionStatus::Queued,
            history: vec![(ExecutionStatus::Queued, now)],
        }
    }

    /// Get the current status
    pub fn current(&self) -> ExecutionStatus {
        self.current
    }

    /// Transition to a new status
    ///
    /// Invalid transitions, including any transition out of a terminal
    /// status, are rejected without mutating the machine.
    pub fn transition(&mut self, next: ExecutionStatus) -> crate::Result<()> {
        if !is_valid_transition(self.current, next) {
            return Err(crate::Error::InvalidState(format!(
                "Invalid transition from {} to {}",
                self.current, next
            )));
        }

        self.current = next;
        self.history.push((next, Utc::now()));
        Ok(())
    }

    /// Timestamped status history, oldest first
    pub fn history(&self) -> &[(ExecutionStatus, DateTime<Utc>)] {
        &self.history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
