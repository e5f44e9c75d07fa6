//! Execution status lifecycle and result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an execution record (test case or suite member)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Execution is created and waiting for a worker
    Queued,

    /// Execution is currently running steps
    Running,

    /// Execution finished with a definite result
    Completed,

    /// Execution failed outside normal step evaluation
    Error,
}

impl ExecutionStatus {
    /// Whether this status accepts no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ExecutionStatus {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self, crate::Error> {
        match s {
            "queued" => Ok(ExecutionStatus::Queued),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "error" => Ok(ExecutionStatus::Error),
            _ => Err(crate::Error::UnknownStatus(s.to_string())),
        }
    }
}

/// Validate if a status transition is legal
///
/// This is a pure function over the closed transition table. The only
/// valid edges are:
///
/// - Queued → Running
/// - Queued → Error
/// - Running → Completed
/// - Running → Error
///
/// Everything else, including self-transitions and any transition out of
/// a terminal status, is invalid.
pub fn is_valid_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    use ExecutionStatus::*;

    matches!(
        (from, to),
        (Queued, Running) | (Queued, Error) | (Running, Completed) | (Running, Error)
    )
}

/// Overall result of a completed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
    Error,
}

impl TestResult {
    pub fn as_str(self) -> &'static str {
        match self {
            TestResult::Pass => "pass",
            TestResult::Fail => "fail",
            TestResult::Error => "error",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TestResult {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self, crate::Error> {
        match s {
            "pass" => Ok(TestResult::Pass),
            "fail" => Ok(TestResult::Fail),
            "error" => Ok(TestResult::Error),
            _ => Err(crate::Error::UnknownResult(s.to_string())),
        }
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pass,
    Fail,
    Error,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pass => "pass",
            StepStatus::Fail => "fail",
            StepStatus::Error => "error",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ExecutionStatus; 4] = [
        ExecutionStatus::Queued,
        ExecutionStatus::Running,
        ExecutionStatus::Completed,
        ExecutionStatus::Error,
    ];

    #[test]
    fn test_valid_transitions() {
        use ExecutionStatus::*;

        assert!(is_valid_transition(Queued, Running));
        assert!(is_valid_transition(Queued, Error));
        assert!(is_valid_transition(Running, Completed));
        assert!(is_valid_transition(Running, Error));
    }

    #[test]
    fn test_exhaustive_transition_table() {
        use ExecutionStatus::*;

        let valid = [
            (Queued, Running),
            (Queued, Error),
            (Running, Completed),
            (Running, Error),
        ];

        for from in ALL {
            for to in ALL {
                let expected = valid.contains(&(from, to));
                assert_eq!(
                    is_valid_transition(from, to),
                    expected,
                    "transition {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for from in [ExecutionStatus::Completed, ExecutionStatus::Error] {
            for to in ALL {
                assert!(!is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn test_self_transitions_invalid() {
        for status in ALL {
            assert!(!is_valid_transition(status, status));
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in ALL {
            let recovered = ExecutionStatus::try_from(status.as_str()).unwrap();
            assert_eq!(status, recovered);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = ExecutionStatus::try_from("cancelled");
        assert_eq!(
            result,
            Err(crate::Error::UnknownStatus("cancelled".to_string()))
        );
    }

    #[test]
    fn test_result_string_round_trip() {
        for result in [TestResult::Pass, TestResult::Fail, TestResult::Error] {
            assert_eq!(TestResult::try_from(result.as_str()).unwrap(), result);
        }
        assert!(TestResult::try_from("skipped").is_err());
    }
}
