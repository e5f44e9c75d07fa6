//! History query engine
//!
//! Filters and orders persisted execution records. A query must carry at
//! least one identity filter; a filterless scan is a caller defect and is
//! rejected before touching the store.

use crate::models::ExecutionModel;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Filter set for querying execution history
///
/// Results are ordered by `created_at` descending (`id` descending as the
/// stable tiebreak) and capped by `limit` when supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionQuery {
    pub project_id: Option<Uuid>,
    pub test_case_id: Option<Uuid>,
    pub test_suite_id: Option<Uuid>,
    pub suite_execution_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl ExecutionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn test_case(mut self, test_case_id: Uuid) -> Self {
        self.test_case_id = Some(test_case_id);
        self
    }

    pub fn test_suite(mut self, test_suite_id: Uuid) -> Self {
        self.test_suite_id = Some(test_suite_id);
        self
    }

    pub fn suite_execution(mut self, suite_execution_id: Uuid) -> Self {
        self.suite_execution_id = Some(suite_execution_id);
        self
    }

    /// Inclusive `created_at` range; endpoints are normalized on use
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.created_after = Some(start);
        self.created_before = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn has_identity_filter(&self) -> bool {
        self.project_id.is_some()
            || self.test_case_id.is_some()
            || self.test_suite_id.is_some()
            || self.suite_execution_id.is_some()
    }

    /// Reject queries that no store should ever see
    pub fn validate(&self) -> crate::Result<()> {
        if !self.has_identity_filter() {
            return Err(crate::Error::InvalidQuery(
                "history query requires at least one identity filter \
                 (project, test case, test suite or suite execution)"
                    .to_string(),
            ));
        }
        if let Some(limit) = self.limit {
            if limit <= 0 {
                return Err(crate::Error::InvalidQuery(
                    "limit must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Swap date endpoints so the range is always `start <= end`
    pub fn normalized(mut self) -> Self {
        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after > before {
                self.created_after = Some(before);
                self.created_before = Some(after);
            }
        }
        self
    }

    /// Pure predicate: does a record satisfy every supplied filter?
    pub fn matches(&self, execution: &ExecutionModel) -> bool {
        if let Some(project_id) = self.project_id {
            if execution.project_id != project_id {
                return false;
            }
        }
        if let Some(test_case_id) = self.test_case_id {
            if execution.test_case_id != Some(test_case_id) {
                return false;
            }
        }
        if let Some(test_suite_id) = self.test_suite_id {
            if execution.test_suite_id != Some(test_suite_id) {
                return false;
            }
        }
        if let Some(suite_execution_id) = self.suite_execution_id {
            if execution.suite_execution_id != Some(suite_execution_id) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if execution.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if execution.created_at > before {
                return false;
            }
        }
        true
    }
}
