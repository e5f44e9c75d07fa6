//! HTTP handlers for the worker API
//!
//! Routes:
//! - `POST /execute` - queue-delivered execution task (HMAC-verified,
//!   immediate ACK, background run)
//! - `POST /trigger` - trigger a test case or suite (principal required)
//! - `GET /executions` - execution history query (principal required)
//! - `GET /suites/{id}` - derived suite status (principal required)
//! - `GET /health`, `GET /metrics`

use crate::auth::{principal_from_headers, require_permission, AuthError, PERM_READ, PERM_TRIGGER};
use crate::executor::CaseExecutor;
use crate::security::{extract_signature, verify_signature, SIGNATURE_HEADER};
use crate::types::{ExecuteResponse, HealthResponse, TaskPayload, TriggerRequest, TriggerResponse};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use canary_core::ExecutionMetadata;
use canary_runtime::{ExecutionOrchestrator, SuiteExecution, SuiteOrchestrator};
use canary_storage::{ExecutionModel, ExecutionQuery, OrgId, RecordStore};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<CaseExecutor>,
    pub orchestrator: ExecutionOrchestrator,
    pub suites: SuiteOrchestrator,
    pub store: Arc<dyn RecordStore>,
    pub hmac_secret: String,
}

/// Build the worker router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .route("/trigger", post(trigger_handler))
        .route("/executions", get(history_handler))
        .route("/suites/:suite_execution_id", get(suite_status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Execute a queue-delivered task
///
/// Verifies the HMAC signature, decodes the base64 payload, ACKs
/// immediately and runs the execution in the background.
pub async fn execute_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let signature = extract_signature(signature_header).map_err(|_| ApiError::MissingSignature)?;

    verify_signature(&body, signature, &state.hmac_secret).map_err(|e| {
        error!(error = %e, "Signature verification failed");
        ApiError::InvalidSignature
    })?;

    let decoded = STANDARD.decode(&body).map_err(|e| {
        error!(error = %e, "Failed to decode base64 payload");
        ApiError::InvalidPayload("invalid base64 encoding".to_string())
    })?;

    let payload: TaskPayload = serde_json::from_slice(&decoded).map_err(|e| {
        error!(error = %e, "Failed to deserialize payload");
        ApiError::InvalidPayload(format!("invalid JSON: {}", e))
    })?;

    let execution_id = payload.execution_id;
    info!(
        execution_id = %execution_id,
        test_case_id = ?payload.test_case_id,
        "Received execution task"
    );

    // Immediate ACK: the queue retries on non-2xx, so the run itself
    // happens in the background.
    let executor = state.executor.clone();
    tokio::spawn(async move {
        match executor.execute(payload).await {
            Ok(()) => info!(execution_id = %execution_id, "Execution task finished"),
            Err(e) => error!(execution_id = %execution_id, error = %e, "Execution task failed"),
        }
    });

    Ok(Json(ExecuteResponse::accepted(execution_id)))
}

/// Trigger a test case or suite execution
pub async fn trigger_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let principal = principal_from_headers(&headers)?;
    require_permission(&principal, PERM_TRIGGER)?;

    let org = OrgId::new(&principal.organization_id);
    let metadata = ExecutionMetadata {
        triggered_by: Some(principal.user_id.clone()),
        environment: request.environment,
    };

    if let Some(test_suite_id) = request.test_suite_id {
        let suite = state
            .store
            .get_test_suite(test_suite_id, &org)
            .await
            .map_err(|e| match e {
                canary_storage::Error::NotFound(msg) => ApiError::NotFound(msg),
                other => ApiError::Internal(other.to_string()),
            })?;

        let trigger = state
            .suites
            .trigger_suite(
                request.project_id,
                Some(test_suite_id),
                &suite.case_ids.0,
                &org,
                &metadata,
            )
            .await
            .map_err(map_runtime_error)?;

        return Ok(Json(TriggerResponse {
            execution_ids: trigger.execution_ids,
            suite_execution_id: Some(trigger.suite_execution_id),
        }));
    }

    if let Some(case_ids) = &request.test_case_ids {
        let trigger = state
            .suites
            .trigger_suite(request.project_id, None, case_ids, &org, &metadata)
            .await
            .map_err(map_runtime_error)?;

        return Ok(Json(TriggerResponse {
            execution_ids: trigger.execution_ids,
            suite_execution_id: Some(trigger.suite_execution_id),
        }));
    }

    if let Some(test_case_id) = request.test_case_id {
        let execution_id = state
            .orchestrator
            .create_execution(request.project_id, Some(test_case_id), &org, &metadata)
            .await
            .map_err(map_runtime_error)?;

        return Ok(Json(TriggerResponse {
            execution_ids: vec![execution_id],
            suite_execution_id: None,
        }));
    }

    Err(ApiError::BadRequest(
        "request must name a test case, a case list or a test suite".to_string(),
    ))
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub project_id: Option<Uuid>,
    pub test_case_id: Option<Uuid>,
    pub test_suite_id: Option<Uuid>,
    pub suite_execution_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Query execution history
pub async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ExecutionModel>>, ApiError> {
    let principal = principal_from_headers(&headers)?;
    require_permission(&principal, PERM_READ)?;

    let org = OrgId::new(&principal.organization_id);
    let query = ExecutionQuery {
        project_id: params.project_id,
        test_case_id: params.test_case_id,
        test_suite_id: params.test_suite_id,
        suite_execution_id: params.suite_execution_id,
        created_after: params.created_after,
        created_before: params.created_before,
        limit: params.limit,
    };

    let executions = state
        .store
        .query_executions(&query, &org)
        .await
        .map_err(|e| match e {
            canary_storage::Error::InvalidQuery(msg) => {
                warn!(error = %msg, "Rejected history query");
                ApiError::BadRequest(msg)
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    Ok(Json(executions))
}

/// Derived status of a suite execution
pub async fn suite_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(suite_execution_id): Path<Uuid>,
) -> Result<Json<SuiteExecution>, ApiError> {
    let principal = principal_from_headers(&headers)?;
    require_permission(&principal, PERM_READ)?;

    let org = OrgId::new(&principal.organization_id);
    let view = state
        .suites
        .status(suite_execution_id, &org)
        .await
        .map_err(map_runtime_error)?;

    Ok(Json(view))
}

/// Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Prometheus metrics endpoint
pub async fn metrics_handler() -> Result<String, ApiError> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| ApiError::Internal(e.to_string()))
}

fn map_runtime_error(e: canary_runtime::Error) -> ApiError {
    match e {
        canary_runtime::Error::Execution(msg) => ApiError::BadRequest(msg),
        canary_runtime::Error::NotFound(msg) => ApiError::NotFound(msg),
        other => ApiError::Internal(other.to_string()),
    }
}

/// API error responses
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Forbidden(String),
    MissingSignature,
    InvalidSignature,
    InvalidPayload(String),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => ApiError::Unauthenticated,
            AuthError::Forbidden(permission) => ApiError::Forbidden(permission),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Missing or invalid principal".to_string())
            }
            ApiError::Forbidden(permission) => (
                StatusCode::FORBIDDEN,
                format!("Missing permission: {}", permission),
            ),
            ApiError::MissingSignature => {
                (StatusCode::UNAUTHORIZED, "Missing signature header".to_string())
            }
            ApiError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature".to_string())
            }
            ApiError::InvalidPayload(msg) => {
                warn!(error = %msg, "Invalid payload received");
                (StatusCode::BAD_REQUEST, "Invalid payload".to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("executions:read".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::MissingSignature.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.0.status, "healthy");
        assert!(response.0.version.is_some());
    }
}
