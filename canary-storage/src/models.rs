//! Database models for Canary execution records

use canary_core::{ExecutionMetadata, ExecutionStatus, StepDefinition, StepResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Test case model for database storage
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestCaseModel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub steps: Json<Vec<StepDefinition>>,
    pub org_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCaseModel {
    /// Build a storable model from a domain test case
    pub fn from_case(case: &canary_core::TestCase, org: &crate::OrgId) -> Self {
        let now = Utc::now();
        Self {
            id: case.id,
            project_id: case.project_id,
            name: case.name.clone(),
            description: case.description.clone(),
            steps: Json(case.steps.clone()),
            org_id: Some(org.as_str().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert back into the domain test case
    pub fn into_case(self) -> canary_core::TestCase {
        canary_core::TestCase {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            description: self.description,
            steps: self.steps.0,
        }
    }
}

/// Test suite model for database storage
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSuiteModel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub case_ids: Json<Vec<Uuid>>,
    pub org_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSuiteModel {
    /// Build a storable model from a domain test suite
    pub fn from_suite(suite: &canary_core::TestSuite, org: &crate::OrgId) -> Self {
        let now = Utc::now();
        Self {
            id: suite.id,
            project_id: suite.project_id,
            name: suite.name.clone(),
            case_ids: Json(suite.case_ids.clone()),
            org_id: Some(org.as_str().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert back into the domain test suite
    pub fn into_suite(self) -> canary_core::TestSuite {
        canary_core::TestSuite {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            case_ids: self.case_ids.0,
        }
    }
}

/// Execution record for database storage
///
/// One record per test case run. Status is mutated only through the
/// conditional [`crate::RecordStore::update_status`] gate; step results
/// are written once by the orchestrator when the run finishes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionModel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub test_case_id: Option<Uuid>,
    pub test_suite_id: Option<Uuid>,
    pub suite_execution_id: Option<Uuid>,
    pub org_id: Option<String>,
    pub status: String,
    pub result: Option<String>,
    pub steps: Json<Vec<StepResult>>,
    pub screenshots: Json<Vec<String>>,
    pub triggered_by: Option<String>,
    pub environment: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionModel {
    /// Create a fresh `queued` record for a test case run
    pub fn queued(
        project_id: Uuid,
        test_case_id: Option<Uuid>,
        org: &crate::OrgId,
        metadata: &ExecutionMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            test_case_id,
            test_suite_id: None,
            suite_execution_id: None,
            org_id: Some(org.as_str().to_string()),
            status: ExecutionStatus::Queued.as_str().to_string(),
            result: None,
            steps: Json(Vec::new()),
            screenshots: Json(Vec::new()),
            triggered_by: metadata.triggered_by.clone(),
            environment: metadata.environment.map(|e| e.as_str().to_string()),
            error_message: None,
            started_at: now,
            completed_at: None,
            duration_ms: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach this execution to a suite trigger
    pub fn in_suite(mut self, test_suite_id: Option<Uuid>, suite_execution_id: Uuid) -> Self {
        self.test_suite_id = test_suite_id;
        self.suite_execution_id = Some(suite_execution_id);
        self
    }

    /// Parse the stored status string into the closed status set
    pub fn current_status(&self) -> crate::Result<ExecutionStatus> {
        ExecutionStatus::try_from(self.status.as_str())
            .map_err(|e| crate::Error::Internal(format!("Corrupt status in record: {}", e)))
    }

    /// Derived duration; negative values are treated as absent
    pub fn duration(&self) -> Option<i64> {
        match self.duration_ms {
            Some(d) if d >= 0 => Some(d),
            Some(_) => None,
            None => {
                let end = self.completed_at?;
                let delta = end.signed_duration_since(self.started_at).num_milliseconds();
                if delta >= 0 {
                    Some(delta)
                } else {
                    None
                }
            }
        }
    }

    /// Append a screenshot reference, keeping the set free of duplicates
    pub fn add_screenshot(&mut self, reference: String) {
        if !self.screenshots.0.contains(&reference) {
            self.screenshots.0.push(reference);
        }
    }
}
