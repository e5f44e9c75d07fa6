//! Collaborator seams for browser automation and screenshot storage
//!
//! The actual automation driver and artifact store live outside the core;
//! these traits pin down the contracts the orchestration engine relies on.

use async_trait::async_trait;
use canary_core::Action;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Result of one driver action invocation
///
/// The driver reports failure in-band; it never raises for an ordinary
/// action failure.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub success: bool,
    pub details: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Successful outcome without details
    pub fn ok() -> Self {
        Self {
            success: true,
            details: None,
            error: None,
        }
    }

    /// Successful outcome carrying action-specific data
    pub fn ok_with_details(details: serde_json::Value) -> Self {
        Self {
            success: true,
            details: Some(details),
            error: None,
        }
    }

    /// Failed outcome with a diagnostic message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            details: None,
            error: Some(message.into()),
        }
    }
}

/// Browser/API automation driver
///
/// One instance represents one live session. Implementations must honor
/// the caller-supplied timeout and return rather than hang past it; the
/// engine additionally guards every call with its own timeout.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Perform one action against the session
    async fn execute(
        &self,
        action: Action,
        target: Option<&str>,
        value: Option<&str>,
        timeout: Duration,
    ) -> ActionOutcome;

    /// Release the session; called on every orchestrator exit path
    async fn close(&self) {}
}

/// Screenshot artifact storage
///
/// Capture is best-effort: a failure yields `None`, never an error, so a
/// broken artifact store can never crash a run.
#[async_trait]
pub trait ScreenshotStore: Send + Sync {
    /// Capture and persist a screenshot for a failed step
    ///
    /// The returned reference is unique per `(execution_id, step_index)`
    /// and otherwise opaque to the engine.
    async fn capture_and_store(&self, execution_id: Uuid, step_index: u32) -> Option<String>;
}

/// Screenshot store that captures nothing
pub struct NoScreenshots;

#[async_trait]
impl ScreenshotStore for NoScreenshots {
    async fn capture_and_store(&self, _execution_id: Uuid, _step_index: u32) -> Option<String> {
        None
    }
}

/// Per-execution context handed to the step executor
///
/// Owns the optional browser session handle. UI actions require the
/// handle; `api-call` steps run without it. The handle is released with
/// [`ExecutionContext::close`] on every orchestrator exit path, including
/// failures.
pub struct ExecutionContext {
    browser: Option<Arc<dyn AutomationDriver>>,
}

impl ExecutionContext {
    /// Context with a live browser session
    pub fn with_browser(browser: Arc<dyn AutomationDriver>) -> Self {
        Self {
            browser: Some(browser),
        }
    }

    /// Context without a browser; only `api-call` steps can run
    pub fn api_only() -> Self {
        Self { browser: None }
    }

    /// The browser session handle, if one is attached
    pub fn browser(&self) -> Option<&Arc<dyn AutomationDriver>> {
        self.browser.as_ref()
    }

    /// Release the browser session; safe to call more than once
    pub async fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            browser.close().await;
        }
    }
}
