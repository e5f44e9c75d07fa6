//! Step results and execution result determination

use crate::status::{StepStatus, TestResult};
use serde::{Deserialize, Serialize};

/// Outcome of one executed step
///
/// Step results are appended in execution order and never mutated or
/// reordered after append. The action is kept as the raw tag so unknown
/// actions remain visible in diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Zero-based position in the test case, strictly increasing
    pub step_index: u32,

    /// Raw action tag this result belongs to
    pub action: String,

    /// Outcome of the step
    pub status: StepStatus,

    /// Wall-clock duration of the step in milliseconds
    pub duration_ms: u64,

    /// Diagnostic message for failed or errored steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Artifact reference captured for failed UI steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,

    /// Action-specific structured data reported by the driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StepResult {
    /// Create a passing step result
    pub fn pass(step_index: u32, action: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_index,
            action: action.into(),
            status: StepStatus::Pass,
            duration_ms,
            error_message: None,
            screenshot: None,
            details: None,
        }
    }

    /// Create a failed step result with a diagnostic message
    pub fn fail(
        step_index: u32,
        action: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step_index,
            action: action.into(),
            status: StepStatus::Fail,
            duration_ms,
            error_message: Some(message.into()),
            screenshot: None,
            details: None,
        }
    }

    /// Create an errored step result with a diagnostic message
    pub fn error(
        step_index: u32,
        action: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step_index,
            action: action.into(),
            status: StepStatus::Error,
            duration_ms,
            error_message: Some(message.into()),
            screenshot: None,
            details: None,
        }
    }

    pub fn with_screenshot(mut self, reference: impl Into<String>) -> Self {
        self.screenshot = Some(reference.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Determine the overall execution result from its step results
///
/// Any errored step makes the execution `error`; otherwise any failed step
/// makes it `fail`; otherwise a non-empty sequence is `pass`. An empty
/// sequence means no step ever ran, which resolves to `error`, never a
/// silent pass.
pub fn determine_result(steps: &[StepResult]) -> TestResult {
    if steps.is_empty() {
        return TestResult::Error;
    }
    if steps.iter().any(|s| s.status == StepStatus::Error) {
        return TestResult::Error;
    }
    if steps.iter().any(|s| s.status == StepStatus::Fail) {
        return TestResult::Fail;
    }
    TestResult::Pass
}
