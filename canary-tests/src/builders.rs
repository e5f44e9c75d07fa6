//! Type-safe builders for constructing test objects
//!
//! Builders provide a fluent API for constructing execution records,
//! test cases and signed worker requests with clear, readable code.

use axum::body::Body;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use canary_core::{ExecutionMetadata, StepDefinition, TestCase};
use canary_storage::{ExecutionModel, OrgId};
use canary_worker::security::{sign_payload, SIGNATURE_HEADER};
use chrono::Duration as ChronoDuration;
use http::Request;
use serde_json::json;
use uuid::Uuid;

/// Builder for execution records in arbitrary lifecycle states
pub struct ExecutionBuilder {
    project_id: Uuid,
    test_case_id: Option<Uuid>,
    org: OrgId,
    status: String,
    result: Option<String>,
    duration_ms: Option<i64>,
    suite: Option<(Option<Uuid>, Uuid)>,
    created_offset_secs: i64,
}

impl ExecutionBuilder {
    pub fn new() -> Self {
        Self {
            project_id: Uuid::new_v4(),
            test_case_id: Some(Uuid::new_v4()),
            org: OrgId::new("test-org"),
            status: "queued".to_string(),
            result: None,
            duration_ms: None,
            suite: None,
            created_offset_secs: 0,
        }
    }

    pub fn project(mut self, project_id: Uuid) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn test_case(mut self, test_case_id: Uuid) -> Self {
        self.test_case_id = Some(test_case_id);
        self
    }

    pub fn org(mut self, org: &str) -> Self {
        self.org = OrgId::new(org);
        self
    }

    /// Terminal `completed` record with the given result
    pub fn completed(mut self, result: &str) -> Self {
        self.status = "completed".to_string();
        self.result = Some(result.to_string());
        self
    }

    /// Terminal `error` record
    pub fn errored(mut self) -> Self {
        self.status = "error".to_string();
        self
    }

    pub fn running(mut self) -> Self {
        self.status = "running".to_string();
        self
    }

    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn in_suite(mut self, test_suite_id: Option<Uuid>, suite_execution_id: Uuid) -> Self {
        self.suite = Some((test_suite_id, suite_execution_id));
        self
    }

    /// Shift `created_at` (and `started_at`) by the given seconds; useful
    /// for building ordered histories
    pub fn created_offset_secs(mut self, offset: i64) -> Self {
        self.created_offset_secs = offset;
        self
    }

    pub fn build(self) -> ExecutionModel {
        let mut execution = ExecutionModel::queued(
            self.project_id,
            self.test_case_id,
            &self.org,
            &ExecutionMetadata::default(),
        );
        if let Some((test_suite_id, suite_execution_id)) = self.suite {
            execution = execution.in_suite(test_suite_id, suite_execution_id);
        }

        execution.created_at = execution.created_at + ChronoDuration::seconds(self.created_offset_secs);
        execution.started_at = execution.created_at;
        execution.status = self.status;
        execution.result = self.result;
        execution.duration_ms = self.duration_ms;
        if execution.status == "completed" || execution.status == "error" {
            execution.completed_at = Some(
                execution.started_at
                    + ChronoDuration::milliseconds(self.duration_ms.unwrap_or(1000)),
            );
        }
        execution
    }
}

impl Default for ExecutionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test case definitions
pub struct TestCaseBuilder {
    project_id: Uuid,
    name: String,
    steps: Vec<StepDefinition>,
}

impl TestCaseBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn project(mut self, project_id: Uuid) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn step(mut self, action: &str, target: &str) -> Self {
        self.steps
            .push(StepDefinition::new(action).with_target(target));
        self
    }

    pub fn raw_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> TestCase {
        TestCase::new(self.project_id, self.name).with_steps(self.steps)
    }
}

/// Builder for signed `/execute` requests to the worker
pub struct ExecuteRequestBuilder {
    execution_id: Uuid,
    test_case_id: Option<Uuid>,
    project_id: Uuid,
    organization_id: String,
    suite_execution_id: Option<Uuid>,
    hmac_secret: Option<String>,
    custom_headers: Vec<(String, String)>,
}

impl ExecuteRequestBuilder {
    /// Create a new builder with random IDs
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            test_case_id: Some(Uuid::new_v4()),
            project_id: Uuid::new_v4(),
            organization_id: "test-org".to_string(),
            suite_execution_id: None,
            hmac_secret: None,
            custom_headers: Vec::new(),
        }
    }

    pub fn execution_id(mut self, id: Uuid) -> Self {
        self.execution_id = id;
        self
    }

    pub fn test_case_id(mut self, id: Uuid) -> Self {
        self.test_case_id = Some(id);
        self
    }

    pub fn project_id(mut self, id: Uuid) -> Self {
        self.project_id = id;
        self
    }

    pub fn organization(mut self, org: &str) -> Self {
        self.organization_id = org.to_string();
        self
    }

    /// Sign the request with HMAC
    pub fn signed(mut self, secret: &str) -> Self {
        self.hmac_secret = Some(secret.to_string());
        self
    }

    /// Add a custom header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.custom_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Build the HTTP request
    pub fn build(self) -> Request<Body> {
        let payload = json!({
            "execution_id": self.execution_id,
            "test_case_id": self.test_case_id,
            "project_id": self.project_id,
            "organization_id": self.organization_id,
            "suite_execution_id": self.suite_execution_id,
        });
        let body = STANDARD.encode(serde_json::to_vec(&payload).expect("payload serializes"));

        let mut request = Request::post("/execute");
        if let Some(secret) = &self.hmac_secret {
            let signature = sign_payload(body.as_bytes(), secret);
            request = request.header(SIGNATURE_HEADER, signature);
        }
        for (name, value) in &self.custom_headers {
            request = request.header(name, value);
        }

        request.body(Body::from(body)).expect("request builds")
    }
}

impl Default for ExecuteRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
