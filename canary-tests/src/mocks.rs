//! Mock implementations of the engine's collaborator seams
//!
//! All mocks record enough of their invocations for tests to assert on
//! dispatch behavior (call counts, attempted targets, queue traffic).

use async_trait::async_trait;
use canary_core::Action;
use canary_runtime::queue::{EnqueueError, EnqueueResult, ExecutionMessage, ExecutionQueue};
use canary_runtime::{ActionOutcome, AutomationDriver, ScreenshotStore};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Driver scripted to fail specific targets
///
/// Everything passes except targets registered with [`MockDriver::fail_on`];
/// every invocation is recorded.
pub struct MockDriver {
    fail_targets: Mutex<Vec<String>>,
    invocations: Mutex<Vec<(Action, Option<String>)>>,
    closes: AtomicU32,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            fail_targets: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
            closes: AtomicU32::new(0),
        }
    }

    /// Script a failing target
    pub fn fail_on(self, target: &str) -> Self {
        self.fail_targets.lock().unwrap().push(target.to_string());
        self
    }

    /// Actions dispatched so far, in order
    pub fn invocations(&self) -> Vec<(Action, Option<String>)> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn execute(
        &self,
        action: Action,
        target: Option<&str>,
        _value: Option<&str>,
        _timeout: Duration,
    ) -> ActionOutcome {
        self.invocations
            .lock()
            .unwrap()
            .push((action, target.map(|t| t.to_string())));

        let failing = target
            .map(|t| self.fail_targets.lock().unwrap().iter().any(|f| f == t))
            .unwrap_or(false);

        if failing {
            ActionOutcome::failed(format!(
                "element '{}' not found",
                target.unwrap_or_default()
            ))
        } else {
            ActionOutcome::ok()
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Driver that fails transiently N times before succeeding
pub struct FlakyDriver {
    failures_remaining: AtomicU32,
    calls: AtomicU32,
    error_message: String,
}

impl FlakyDriver {
    /// Fail the first `failures` invocations with a retryable message
    pub fn new(failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            error_message: "connection reset by peer".to_string(),
        }
    }

    /// Use a custom failure message (e.g. a non-retryable one)
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutomationDriver for FlakyDriver {
    async fn execute(
        &self,
        _action: Action,
        _target: Option<&str>,
        _value: Option<&str>,
        _timeout: Duration,
    ) -> ActionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            ActionOutcome::failed(self.error_message.clone())
        } else {
            ActionOutcome::ok()
        }
    }
}

/// Queue that records every message without delivering anywhere
pub struct RecordingQueue {
    messages: Mutex<Vec<ExecutionMessage>>,
    fail: AtomicU32,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: AtomicU32::new(0),
        }
    }

    /// Make the next `count` enqueues fail
    pub fn fail_next(self, count: u32) -> Self {
        self.fail.store(count, Ordering::SeqCst);
        self
    }

    pub fn messages(&self) -> Vec<ExecutionMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for RecordingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionQueue for RecordingQueue {
    async fn enqueue(&self, message: ExecutionMessage) -> EnqueueResult<String> {
        let failures = self.fail.load(Ordering::SeqCst);
        if failures > 0 {
            self.fail.store(failures - 1, Ordering::SeqCst);
            return Err(EnqueueError::QueueApi("scripted enqueue failure".to_string()));
        }
        let id = message.execution_id.to_string();
        self.messages.lock().unwrap().push(message);
        Ok(id)
    }
}

/// Screenshot store returning a deterministic reference per capture
pub struct StaticScreenshots;

#[async_trait]
impl ScreenshotStore for StaticScreenshots {
    async fn capture_and_store(&self, execution_id: Uuid, step_index: u32) -> Option<String> {
        Some(format!("screenshots/{}/step-{}.png", execution_id, step_index))
    }
}

/// Screenshot store that always fails to capture
pub struct NullScreenshots;

#[async_trait]
impl ScreenshotStore for NullScreenshots {
    async fn capture_and_store(&self, _execution_id: Uuid, _step_index: u32) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_scripted_failure() {
        let driver = MockDriver::new().fail_on("#broken");

        let ok = driver
            .execute(Action::Click, Some("#fine"), None, Duration::from_secs(1))
            .await;
        assert!(ok.success);

        let failed = driver
            .execute(Action::Click, Some("#broken"), None, Duration::from_secs(1))
            .await;
        assert!(!failed.success);

        assert_eq!(driver.call_count(), 2);
        assert_eq!(driver.invocations()[1].1.as_deref(), Some("#broken"));
    }

    #[tokio::test]
    async fn test_flaky_driver_recovers() {
        let driver = FlakyDriver::new(2);
        assert!(!driver.execute(Action::Wait, None, None, Duration::from_secs(1)).await.success);
        assert!(!driver.execute(Action::Wait, None, None, Duration::from_secs(1)).await.success);
        assert!(driver.execute(Action::Wait, None, None, Duration::from_secs(1)).await.success);
        assert_eq!(driver.call_count(), 3);
    }

    #[tokio::test]
    async fn test_recording_queue_failure_script() {
        let queue = RecordingQueue::new().fail_next(1);
        let message = ExecutionMessage {
            execution_id: Uuid::new_v4(),
            test_case_id: None,
            project_id: Uuid::new_v4(),
            organization_id: "org".to_string(),
            suite_execution_id: None,
        };

        assert!(queue.enqueue(message.clone()).await.is_err());
        assert!(queue.enqueue(message).await.is_ok());
        assert_eq!(queue.messages().len(), 1);
    }
}
