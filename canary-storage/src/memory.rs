//! In-memory record store
//!
//! Backs tests and local mode with the same semantics as the Postgres
//! store: org isolation, conditional status updates, history ordering.
//! Status updates run inside a single write-lock critical section so the
//! check-and-set is atomic per record.

use crate::history::ExecutionQuery;
use crate::models::{ExecutionModel, TestCaseModel, TestSuiteModel};
use crate::store::RecordStore;
use crate::{Error, OrgId, Result};
use async_trait::async_trait;
use canary_core::{is_valid_transition, ExecutionStatus, StepResult, TestResult};
use chrono::Utc;
use sqlx::types::Json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of [`RecordStore`]
#[derive(Default)]
pub struct MemoryStore {
    executions: RwLock<HashMap<Uuid, ExecutionModel>>,
    test_cases: RwLock<HashMap<Uuid, TestCaseModel>>,
    test_suites: RwLock<HashMap<Uuid, TestSuiteModel>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_org(record_org: &Option<String>, org: &OrgId, what: &str, id: Uuid) -> Result<()> {
        match record_org {
            Some(record_org) if record_org == org.as_str() => Ok(()),
            // Records from another org are indistinguishable from absent ones
            _ => Err(Error::NotFound(format!("{} {}", what, id))),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_execution(&self, execution: &ExecutionModel, org: &OrgId) -> Result<()> {
        let mut executions = self.executions.write().await;
        if executions.contains_key(&execution.id) {
            return Err(Error::AlreadyExists(format!("Execution {}", execution.id)));
        }
        let mut record = execution.clone();
        record.org_id = Some(org.as_str().to_string());
        executions.insert(record.id, record);
        Ok(())
    }

    async fn get_execution(&self, id: Uuid, org: &OrgId) -> Result<ExecutionModel> {
        let executions = self.executions.read().await;
        let execution = executions
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Execution {}", id)))?;
        Self::check_org(&execution.org_id, org, "Execution", id)?;
        Ok(execution.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ExecutionStatus,
        next: ExecutionStatus,
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()> {
        if !is_valid_transition(expected, next) {
            return Err(Error::InvalidTransition(format!(
                "{} -> {} is not a legal transition",
                expected, next
            )));
        }

        // Check-and-set under one write lock: no other writer can observe
        // or change the record between the status check and the update.
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Execution {}", id)))?;
        Self::check_org(&execution.org_id, org, "Execution", id)?;

        let current = execution.current_status()?;
        if current != expected {
            return Err(Error::Conflict(format!(
                "Execution {} status is {}, expected {}",
                id, current, expected
            )));
        }

        let now = Utc::now();
        execution.status = next.as_str().to_string();
        execution.updated_at = now;
        if let Some(message) = error_message {
            execution.error_message = Some(message.to_string());
        }
        if next.is_terminal() && execution.completed_at.is_none() {
            execution.completed_at = Some(now);
            let delta = now
                .signed_duration_since(execution.started_at)
                .num_milliseconds();
            execution.duration_ms = if delta >= 0 { Some(delta) } else { None };
        }
        Ok(())
    }

    async fn update_results(
        &self,
        id: Uuid,
        steps: &[StepResult],
        result: TestResult,
        screenshots: &[String],
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Execution {}", id)))?;
        Self::check_org(&execution.org_id, org, "Execution", id)?;

        execution.steps = Json(steps.to_vec());
        execution.result = Some(result.as_str().to_string());
        for reference in screenshots {
            execution.add_screenshot(reference.clone());
        }
        if let Some(message) = error_message {
            execution.error_message = Some(message.to_string());
        }
        execution.updated_at = Utc::now();
        Ok(())
    }

    async fn query_executions(
        &self,
        query: &ExecutionQuery,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>> {
        query.validate()?;
        let query = query.clone().normalized();

        let executions = self.executions.read().await;
        let mut matches: Vec<ExecutionModel> = executions
            .values()
            .filter(|e| e.org_id.as_deref() == Some(org.as_str()))
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        // created_at descending, id descending as the stable tiebreak
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn list_suite_members(
        &self,
        suite_execution_id: Uuid,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>> {
        let executions = self.executions.read().await;
        let mut members: Vec<ExecutionModel> = executions
            .values()
            .filter(|e| e.org_id.as_deref() == Some(org.as_str()))
            .filter(|e| e.suite_execution_id == Some(suite_execution_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn create_test_case(&self, case: &TestCaseModel, org: &OrgId) -> Result<()> {
        let mut cases = self.test_cases.write().await;
        if cases.contains_key(&case.id) {
            return Err(Error::AlreadyExists(format!("Test case {}", case.id)));
        }
        let mut record = case.clone();
        record.org_id = Some(org.as_str().to_string());
        cases.insert(record.id, record);
        Ok(())
    }

    async fn get_test_case(&self, id: Uuid, org: &OrgId) -> Result<TestCaseModel> {
        let cases = self.test_cases.read().await;
        let case = cases
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Test case {}", id)))?;
        Self::check_org(&case.org_id, org, "Test case", id)?;
        Ok(case.clone())
    }

    async fn create_test_suite(&self, suite: &TestSuiteModel, org: &OrgId) -> Result<()> {
        let mut suites = self.test_suites.write().await;
        if suites.contains_key(&suite.id) {
            return Err(Error::AlreadyExists(format!("Test suite {}", suite.id)));
        }
        let mut record = suite.clone();
        record.org_id = Some(org.as_str().to_string());
        suites.insert(record.id, record);
        Ok(())
    }

    async fn get_test_suite(&self, id: Uuid, org: &OrgId) -> Result<TestSuiteModel> {
        let suites = self.test_suites.read().await;
        let suite = suites
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Test suite {}", id)))?;
        Self::check_org(&suite.org_id, org, "Test suite", id)?;
        Ok(suite.clone())
    }
}
