//! PostgreSQL record store implementation

use crate::history::ExecutionQuery;
use crate::models::{ExecutionModel, TestCaseModel, TestSuiteModel};
use crate::store::RecordStore;
use crate::{OrgId, Result};
use async_trait::async_trait;
use canary_core::{is_valid_transition, ExecutionStatus, StepResult, TestResult};
use futures::future::BoxFuture;
use sqlx::types::Json;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Instant;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Configuration for the PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

/// PostgreSQL storage backend
///
/// Every operation runs in a transaction with the `app.current_org`
/// session variable set, so row-level security policies scope reads and
/// writes to the caller's organization.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect with default pool configuration
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_config(database_url, PoolConfig::default()).await
    }

    /// Connect using an explicit pool configuration
    pub async fn with_pool_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        if config.max_connections == 0 || config.max_connections < config.min_connections {
            return Err(crate::Error::Internal(
                "max_connections must be >= min_connections and > 0".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute a closure within a transaction with org context set
    ///
    /// Sets `app.current_org` for RLS enforcement, commits on success and
    /// rolls back on error. Slow operations (>100ms) are logged.
    async fn with_org_context<F, T>(&self, org: &OrgId, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Transaction<'_, Postgres>) -> BoxFuture<'c, Result<T>> + Send,
        T: Send,
    {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('app.current_org', $1, true)")
            .bind(org.as_str())
            .execute(&mut *tx)
            .await?;

        let result = match f(&mut tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(
                org_id = %org.as_str(),
                duration_ms = elapsed.as_millis(),
                "Slow database operation detected"
            );
        }

        result
    }
}

fn map_db_error(e: sqlx::Error) -> crate::Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return crate::Error::AlreadyExists(db.message().to_string());
        }
    }
    crate::Error::Database(e)
}

const EXECUTION_COLUMNS: &str = "id, project_id, test_case_id, test_suite_id, suite_execution_id, \
     org_id, status, result, steps, screenshots, triggered_by, environment, error_message, \
     started_at, completed_at, duration_ms, created_at, updated_at";

#[async_trait]
impl RecordStore for PostgresStorage {
    #[instrument(
        skip(self, execution, org),
        fields(
            db.operation = "INSERT",
            db.sql.table = "executions",
            org_id = %org.as_str(),
            execution_id = %execution.id
        )
    )]
    async fn create_execution(&self, execution: &ExecutionModel, org: &OrgId) -> Result<()> {
        let execution = execution.clone();
        let org_str = org.as_str().to_string();

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    INSERT INTO executions (
                        id, project_id, test_case_id, test_suite_id, suite_execution_id,
                        org_id, status, result, steps, screenshots, triggered_by, environment,
                        error_message, started_at, completed_at, duration_ms, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
                    "#,
                )
                .bind(execution.id)
                .bind(execution.project_id)
                .bind(execution.test_case_id)
                .bind(execution.test_suite_id)
                .bind(execution.suite_execution_id)
                .bind(&org_str)
                .bind(&execution.status)
                .bind(&execution.result)
                .bind(&execution.steps)
                .bind(&execution.screenshots)
                .bind(&execution.triggered_by)
                .bind(&execution.environment)
                .bind(&execution.error_message)
                .bind(execution.started_at)
                .bind(execution.completed_at)
                .bind(execution.duration_ms)
                .bind(execution.created_at)
                .bind(execution.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(())
            })
        })
        .await
    }

    #[instrument(
        skip(self, org),
        fields(
            db.operation = "SELECT",
            db.sql.table = "executions",
            org_id = %org.as_str(),
            execution_id = %id
        )
    )]
    async fn get_execution(&self, id: Uuid, org: &OrgId) -> Result<ExecutionModel> {
        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let execution = sqlx::query_as::<_, ExecutionModel>(&format!(
                    "SELECT {} FROM executions WHERE id = $1",
                    EXECUTION_COLUMNS
                ))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?
                .ok_or_else(|| crate::Error::NotFound(format!("Execution {}", id)))?;

                Ok(execution)
            })
        })
        .await
    }

    #[instrument(
        skip(self, error_message, org),
        fields(
            db.operation = "UPDATE",
            db.sql.table = "executions",
            org_id = %org.as_str(),
            execution_id = %id,
            from_status = %expected,
            to_status = %next,
        )
    )]
    async fn update_status(
        &self,
        id: Uuid,
        expected: ExecutionStatus,
        next: ExecutionStatus,
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()> {
        if !is_valid_transition(expected, next) {
            return Err(crate::Error::InvalidTransition(format!(
                "{} -> {} is not a legal transition",
                expected, next
            )));
        }

        let error_message = error_message.map(|s| s.to_string());

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                // Guarding on the expected status makes the check-and-set
                // atomic: a record whose status moved underneath us is
                // left untouched and reported as a conflict.
                let updated = sqlx::query(
                    r#"
                    UPDATE executions
                    SET status = $2,
                        error_message = COALESCE($3, error_message),
                        completed_at = CASE WHEN $4 THEN NOW() ELSE completed_at END,
                        duration_ms = CASE
                            WHEN $4 AND NOW() >= started_at
                                THEN CAST(EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000 AS BIGINT)
                            WHEN $4 THEN NULL
                            ELSE duration_ms
                        END,
                        updated_at = NOW()
                    WHERE id = $1 AND status = $5
                    "#,
                )
                .bind(id)
                .bind(next.as_str())
                .bind(&error_message)
                .bind(next.is_terminal())
                .bind(expected.as_str())
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                if updated.rows_affected() == 0 {
                    let current: Option<(String,)> =
                        sqlx::query_as("SELECT status FROM executions WHERE id = $1")
                            .bind(id)
                            .fetch_optional(&mut **tx)
                            .await
                            .map_err(map_db_error)?;

                    return Err(match current {
                        Some((status,)) => crate::Error::Conflict(format!(
                            "Execution {} status is {}, expected {}",
                            id, status, expected
                        )),
                        None => crate::Error::NotFound(format!("Execution {}", id)),
                    });
                }

                Ok(())
            })
        })
        .await
    }

    #[instrument(
        skip(self, steps, screenshots, error_message, org),
        fields(
            db.operation = "UPDATE",
            db.sql.table = "executions",
            org_id = %org.as_str(),
            execution_id = %id,
            step_count = steps.len(),
        )
    )]
    async fn update_results(
        &self,
        id: Uuid,
        steps: &[StepResult],
        result: TestResult,
        screenshots: &[String],
        error_message: Option<&str>,
        org: &OrgId,
    ) -> Result<()> {
        let steps = Json(steps.to_vec());
        let mut unique = Vec::new();
        for reference in screenshots {
            if !unique.contains(reference) {
                unique.push(reference.clone());
            }
        }
        let screenshots = Json(unique);
        let error_message = error_message.map(|s| s.to_string());

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let updated = sqlx::query(
                    r#"
                    UPDATE executions
                    SET steps = $2,
                        result = $3,
                        screenshots = $4,
                        error_message = COALESCE($5, error_message),
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(&steps)
                .bind(result.as_str())
                .bind(&screenshots)
                .bind(&error_message)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                if updated.rows_affected() == 0 {
                    return Err(crate::Error::NotFound(format!("Execution {}", id)));
                }
                Ok(())
            })
        })
        .await
    }

    #[instrument(skip(self, query, org), fields(org_id = %org.as_str()))]
    async fn query_executions(
        &self,
        query: &ExecutionQuery,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>> {
        query.validate()?;
        let query = query.clone().normalized();

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let executions = sqlx::query_as::<_, ExecutionModel>(&format!(
                    r#"
                    SELECT {}
                    FROM executions
                    WHERE ($1::uuid IS NULL OR project_id = $1)
                      AND ($2::uuid IS NULL OR test_case_id = $2)
                      AND ($3::uuid IS NULL OR test_suite_id = $3)
                      AND ($4::uuid IS NULL OR suite_execution_id = $4)
                      AND ($5::timestamptz IS NULL OR created_at >= $5)
                      AND ($6::timestamptz IS NULL OR created_at <= $6)
                    ORDER BY created_at DESC, id DESC
                    LIMIT $7
                    "#,
                    EXECUTION_COLUMNS
                ))
                .bind(query.project_id)
                .bind(query.test_case_id)
                .bind(query.test_suite_id)
                .bind(query.suite_execution_id)
                .bind(query.created_after)
                .bind(query.created_before)
                .bind(query.limit)
                .fetch_all(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(executions)
            })
        })
        .await
    }

    #[instrument(skip(self, org), fields(org_id = %org.as_str(), suite_execution_id = %suite_execution_id))]
    async fn list_suite_members(
        &self,
        suite_execution_id: Uuid,
        org: &OrgId,
    ) -> Result<Vec<ExecutionModel>> {
        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let members = sqlx::query_as::<_, ExecutionModel>(&format!(
                    r#"
                    SELECT {}
                    FROM executions
                    WHERE suite_execution_id = $1
                    ORDER BY created_at ASC, id ASC
                    "#,
                    EXECUTION_COLUMNS
                ))
                .bind(suite_execution_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(members)
            })
        })
        .await
    }

    #[instrument(
        skip(self, case, org),
        fields(
            db.operation = "INSERT",
            db.sql.table = "test_cases",
            org_id = %org.as_str(),
            test_case_id = %case.id
        )
    )]
    async fn create_test_case(&self, case: &TestCaseModel, org: &OrgId) -> Result<()> {
        let case = case.clone();
        let org_str = org.as_str().to_string();

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    INSERT INTO test_cases (
                        id, project_id, name, description, steps, org_id, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(case.id)
                .bind(case.project_id)
                .bind(&case.name)
                .bind(&case.description)
                .bind(&case.steps)
                .bind(&org_str)
                .bind(case.created_at)
                .bind(case.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(())
            })
        })
        .await
    }

    #[instrument(
        skip(self, org),
        fields(
            db.operation = "SELECT",
            db.sql.table = "test_cases",
            org_id = %org.as_str(),
            test_case_id = %id
        )
    )]
    async fn get_test_case(&self, id: Uuid, org: &OrgId) -> Result<TestCaseModel> {
        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let case = sqlx::query_as::<_, TestCaseModel>(
                    r#"
                    SELECT id, project_id, name, description, steps, org_id, created_at, updated_at
                    FROM test_cases
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?
                .ok_or_else(|| crate::Error::NotFound(format!("Test case {}", id)))?;

                Ok(case)
            })
        })
        .await
    }

    #[instrument(
        skip(self, suite, org),
        fields(
            db.operation = "INSERT",
            db.sql.table = "test_suites",
            org_id = %org.as_str(),
            test_suite_id = %suite.id
        )
    )]
    async fn create_test_suite(&self, suite: &TestSuiteModel, org: &OrgId) -> Result<()> {
        let suite = suite.clone();
        let org_str = org.as_str().to_string();

        self.with_org_context(org, |tx| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    INSERT INTO test_suites (
                        id, project_id, name, case_ids, org_id, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(suite.id)
                .bind(suite.project_id)
                .bind(&suite.name)
                .bind(&suite.case_ids)
                .bind(&org_str)
                .bind(suite.created_at)
                .bind(suite.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(())
            })
        })
        .await
    }

    #[instrument(
        skip(self, org),
        fields(
            db.operation = "SELECT",
            db.sql.table = "test_suites",
            org_id = %org.as_str(),
            test_suite_id = %id
        )
    )]
    async fn get_test_suite(&self, id: Uuid, org: &OrgId) -> Result<TestSuiteModel> {
        self.with_org_context(org, |tx| {
            Box::pin(async move {
                let suite = sqlx::query_as::<_, TestSuiteModel>(
                    r#"
                    SELECT id, project_id, name, case_ids, org_id, created_at, updated_at
                    FROM test_suites
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?
                .ok_or_else(|| crate::Error::NotFound(format!("Test suite {}", id)))?;

                Ok(suite)
            })
        })
        .await
    }
}
