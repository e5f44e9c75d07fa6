//! HTTP adapter for the external automation driver
//!
//! The browser-automation service is an external collaborator; this
//! adapter forwards each action as an HTTP POST and maps the response to
//! an [`ActionOutcome`]. It never raises for ordinary failures: transport
//! errors, timeouts and non-2xx responses all become unsuccessful
//! outcomes with a diagnostic message.

use async_trait::async_trait;
use canary_core::Action;
use canary_runtime::{ActionOutcome, AutomationDriver, ScreenshotStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Wire request to the automation service
#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    timeout_ms: u64,
}

/// Wire response from the automation service
#[derive(Debug, Deserialize)]
struct DriverResponse {
    success: bool,
    #[serde(default)]
    details: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Wire response from the screenshot endpoint
#[derive(Debug, Deserialize)]
struct ScreenshotResponse {
    #[serde(default)]
    artifact: Option<String>,
}

/// Automation driver speaking HTTP to the configured driver service
pub struct WebhookDriver {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookDriver {
    /// Create a driver adapter for the given service endpoint
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl AutomationDriver for WebhookDriver {
    async fn execute(
        &self,
        action: Action,
        target: Option<&str>,
        value: Option<&str>,
        timeout: Duration,
    ) -> ActionOutcome {
        let request = DriverRequest {
            action: action.as_str(),
            target,
            value,
            timeout_ms: timeout.as_millis() as u64,
        };

        debug!(action = %action, target = ?target, "Dispatching action to driver");

        let response = self
            .client
            .post(format!("{}/execute", self.endpoint))
            .timeout(timeout)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<DriverResponse>().await {
                    Ok(outcome) => ActionOutcome {
                        success: outcome.success,
                        details: outcome.details,
                        error: outcome.error,
                    },
                    Err(e) => ActionOutcome::failed(format!(
                        "driver returned an unreadable response: {}",
                        e
                    )),
                }
            }
            Ok(response) => ActionOutcome::failed(format!(
                "driver returned status {}",
                response.status()
            )),
            Err(e) if e.is_timeout() => ActionOutcome::failed(format!(
                "driver request timed out after {} ms",
                timeout.as_millis()
            )),
            Err(e) => ActionOutcome::failed(format!("driver request failed: {}", e)),
        }
    }

    async fn close(&self) {
        // Session teardown is best-effort; the driver service reaps
        // abandoned sessions on its own timer as well.
        if let Err(e) = self
            .client
            .post(format!("{}/close", self.endpoint))
            .send()
            .await
        {
            warn!(error = %e, "Failed to close driver session");
        }
    }
}

#[async_trait]
impl ScreenshotStore for WebhookDriver {
    async fn capture_and_store(&self, execution_id: Uuid, step_index: u32) -> Option<String> {
        let result = self
            .client
            .post(format!("{}/screenshot", self.endpoint))
            .json(&serde_json::json!({
                "execution_id": execution_id,
                "step_index": step_index,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                response
                    .json::<ScreenshotResponse>()
                    .await
                    .ok()
                    .and_then(|r| r.artifact)
            }
            Ok(response) => {
                warn!(
                    execution_id = %execution_id,
                    step_index,
                    status = %response.status(),
                    "Screenshot capture failed"
                );
                None
            }
            Err(e) => {
                warn!(
                    execution_id = %execution_id,
                    step_index,
                    error = %e,
                    "Screenshot capture failed"
                );
                None
            }
        }
    }
}
