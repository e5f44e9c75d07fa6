//! Record store abstraction
//!
//! The orchestrator owns execution records through this trait; the status
//! column is mutated only via [`RecordStore::update_status`], which must
//! re-check the persisted status at write time so two writers cannot both
//! believe a terminal record is still mutable.

use crate::history::ExecutionQuery;
use crate::models::{ExecutionModel, TestCaseModel, TestSuiteModel};
use crate::{OrgId, Result};
use async_trait::async_trait;
use canary_core::{ExecutionStatus, StepResult, TestResult};
use uuid::Uuid;

/// Durable storage for execution records and test definitions
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a new execution record
    async fn create_execution(&self, execution: &ExecutionModel, org: &OrgId) -> Result<()>;

    /// Fetch an execution record by ID
    async fn get_execution(&self, id: Uuid, org: &OrgId) -> Result<ExecutionModel>;

    /// Conditionally transition an execution's status
    ///
    /// The write succeeds only if the transition `expected -> next` is
    /// legal and the record's persisted status still equals `expected` at
    /// write time. Terminal transitions also stamp `completed_at` and the
    /// derived duration. A record whose status moved underneath the caller
    /// yields [`crate::Error::Conflict`] without mutating anything.
    async fn update_status(
        &self,
        id: Uuid,
        expected: ExecutionStatus,
        next: ExecutionStatus,
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()>;

    /// Persist the step results and overall result of a finished run
    async fn update_results(
        &self,
        id: Uuid,
        steps: &[StepResult],
        result: TestResult,
        screenshots: &[String],
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()>;

    /// Query execution history (see [`ExecutionQuery`] for semantics)
    async fn query_executions(
        &self,
        query: &ExecutionQuery,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>>;

    /// All members of a suite execution, in creation order
    async fn list_suite_members(
        &self,
        suite_execution_id: Uuid,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>>;

    /// Create a test case definition
    async fn create_test_case(&self, case: &TestCaseModel, org: &OrgId) -> Result<()>;

    /// Fetch a test case definition by ID
    async fn get_test_case(&self, id: Uuid, org: &OrgId) -> Result<TestCaseModel>;

    /// Create a test suite definition
    async fn create_test_suite(&self, suite: &TestSuiteModel, org: &OrgId) -> Result<()>;

    /// Fetch a test suite definition by ID
    async fn get_test_suite(&self, id: Uuid, org: &OrgId) -> Result<TestSuiteModel>;
}
