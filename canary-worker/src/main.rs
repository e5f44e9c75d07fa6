//! Canary worker binary
//!
//! HTTP server that consumes queue-delivered execution tasks and exposes
//! the trigger and history APIs.
//!
//! # Architecture
//!
//! The worker ACKs `/execute` immediately after signature verification
//! and runs the test case in the background; the queue retries delivery
//! on non-2xx responses, and re-deliveries are harmless because terminal
//! executions fail the queued → running gate.

use axum::Router;
use canary_runtime::{ExecutionOrchestrator, LocalQueue, SuiteOrchestrator};
use canary_storage::{PostgresStorage, RecordStore};
use canary_worker::config::{mask_password, WorkerConfig};
use canary_worker::driver::WebhookDriver;
use canary_worker::executor::CaseExecutor;
use canary_worker::handler::{router, AppState};
use canary_worker::types::TaskPayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canary_worker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Canary worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(
        database_url = %mask_password(&config.database_url),
        driver_url = %config.driver_url,
        port = config.port,
        timeout_seconds = config.execution_timeout.as_secs(),
        "Configuration loaded"
    );

    let storage = match PostgresStorage::new(&config.database_url).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!(error = %e, "Failed to initialize storage");
            std::process::exit(1);
        }
    };

    if let Err(e) = canary_storage::migrations::run_migrations(storage.pool()).await {
        error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }
    info!("Storage initialized");

    let driver = match WebhookDriver::new(&config.driver_url) {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            error!(error = %e, "Failed to initialize automation driver");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn RecordStore> = storage;
    let executor = Arc::new(
        CaseExecutor::new(
            store.clone(),
            driver.clone(),
            driver.clone(),
            config.execution_timeout,
        )
        .with_margins(config.timeout_buffer, config.min_step_window),
    );

    // In-process dispatch: triggered executions are fed straight back
    // into this worker's own executor.
    let (queue, mut task_rx) = LocalQueue::new();
    let queue = Arc::new(queue);
    let orchestrator = ExecutionOrchestrator::with_queue(store.clone(), queue.clone());
    let suites = SuiteOrchestrator::new(store.clone(), queue);

    {
        let executor = executor.clone();
        tokio::spawn(async move {
            while let Some(message) = task_rx.recv().await {
                let executor = executor.clone();
                tokio::spawn(async move {
                    let execution_id = message.execution_id;
                    let payload = TaskPayload {
                        execution_id: message.execution_id,
                        test_case_id: message.test_case_id,
                        project_id: message.project_id,
                        organization_id: message.organization_id,
                        suite_execution_id: message.suite_execution_id,
                    };
                    if let Err(e) = executor.execute(payload).await {
                        error!(execution_id = %execution_id, error = %e, "Dispatched execution failed");
                    }
                });
            }
        });
    }

    let state = AppState {
        executor,
        orchestrator,
        suites,
        store,
        hmac_secret: config.hmac_secret.clone(),
    };

    let app: Router = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.execution_timeout + Duration::from_secs(10)))
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, address = %addr, "Failed to bind server");
            std::process::exit(1);
        }
    };

    info!(address = %addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server shut down gracefully");
}

/// Wait for SIGTERM or ctrl-c
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl-C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
