//! Custom assertions for common verification patterns
//!
//! Assertion helpers with focused error messages for execution records,
//! suite views and worker HTTP responses.

use axum::body::Body;
use canary_runtime::SuiteExecution;
use canary_storage::ExecutionModel;
use http::Response;
use http_body_util::BodyExt;
use serde_json::Value;

/// Fluent assertions over an execution record
pub struct ExecutionAssertions<'a> {
    execution: &'a ExecutionModel,
}

impl<'a> ExecutionAssertions<'a> {
    pub fn new(execution: &'a ExecutionModel) -> Self {
        Self { execution }
    }

    pub fn assert_status(self, expected: &str) -> Self {
        assert_eq!(
            self.execution.status, expected,
            "execution {} has status {}, expected {}",
            self.execution.id, self.execution.status, expected
        );
        self
    }

    pub fn assert_result(self, expected: Option<&str>) -> Self {
        assert_eq!(
            self.execution.result.as_deref(),
            expected,
            "execution {} has result {:?}, expected {:?}",
            self.execution.id,
            self.execution.result,
            expected
        );
        self
    }

    pub fn assert_step_count(self, expected: usize) -> Self {
        assert_eq!(
            self.execution.steps.0.len(),
            expected,
            "execution {} recorded {} steps, expected {}",
            self.execution.id,
            self.execution.steps.0.len(),
            expected
        );
        self
    }

    /// Terminal records carry an end timestamp and a consistent duration
    pub fn assert_terminal_timestamps(self) -> Self {
        assert!(
            self.execution.completed_at.is_some(),
            "terminal execution {} lacks completed_at",
            self.execution.id
        );
        assert!(
            self.execution.updated_at >= self.execution.created_at,
            "execution {} has updated_at before created_at",
            self.execution.id
        );
        if let Some(duration) = self.execution.duration() {
            assert!(duration >= 0, "negative duration on {}", self.execution.id);
        }
        self
    }

    pub fn assert_error_contains(self, needle: &str) -> Self {
        let message = self
            .execution
            .error_message
            .as_deref()
            .unwrap_or_else(|| panic!("execution {} has no error message", self.execution.id));
        assert!(
            message.contains(needle),
            "error message '{}' does not contain '{}'",
            message,
            needle
        );
        self
    }
}

/// Assert the suite stats identity and derived status consistency
pub fn assert_suite_consistent(view: &SuiteExecution) {
    assert_eq!(
        view.stats.passed + view.stats.failed + view.stats.errors,
        view.stats.total,
        "suite {} stats do not sum to total",
        view.suite_execution_id
    );
    assert!(
        view.progress_percent <= 100,
        "suite {} progress out of range",
        view.suite_execution_id
    );
    if let Some(duration) = view.duration_ms {
        assert!(duration >= 0, "negative suite duration");
    }
}

/// Read a response body as JSON, panicking with context on failure
pub async fn response_json(response: Response<Body>) -> Value {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body reads")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response (status {}) is not JSON: {} - body: {}",
            status,
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}
