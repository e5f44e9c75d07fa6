//! Wire types for the worker HTTP API
//!
//! `TaskPayload` is the contract between the message queue and the
//! worker; the trigger and history types are the contract with API
//! callers behind the auth middleware.

use canary_core::Environment;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue-delivered task: run one execution
///
/// Delivery is at-least-once; the worker is idempotent on `execution_id`
/// because a re-delivered terminal execution fails the queued → running
/// gate without touching the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    /// UUID of the execution record in storage
    pub execution_id: Uuid,

    /// Test case to load and run
    pub test_case_id: Option<Uuid>,

    /// Project the execution belongs to
    pub project_id: Uuid,

    /// Organization scoping for storage access
    pub organization_id: String,

    /// Present when the execution is part of a suite trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_execution_id: Option<Uuid>,
}

/// Trigger request: one test case, an explicit case list, or a stored suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub project_id: Uuid,

    /// Run a single stored test case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<Uuid>,

    /// Run a stored suite definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suite_id: Option<Uuid>,

    /// Run an ad-hoc set of test cases as one suite execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_ids: Option<Vec<Uuid>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Response to a trigger request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub execution_ids: Vec<Uuid>,

    /// Set when the trigger fanned out as a suite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_execution_id: Option<Uuid>,
}

/// Response from the execute endpoint
///
/// The worker ACKs immediately and processes the run in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: Uuid,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecuteResponse {
    /// Execution accepted for background processing
    pub fn accepted(execution_id: Uuid) -> Self {
        Self {
            execution_id,
            status: "accepted".to_string(),
            message: None,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}
