//! Prometheus metrics for runtime orchestration

use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

lazy_static! {
    /// Total number of execution creation attempts
    ///
    /// Labels:
    /// - status: "success", "failure"
    pub static ref EXECUTION_CREATE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "canary_execution_create_total",
        "Total number of execution creation attempts",
        &["status"]
    )
    .expect("canary_execution_create_total metric registration");

    /// Total number of execution status transitions
    ///
    /// Labels:
    /// - from_status / to_status: "queued", "running", "completed", "error"
    /// - status: "success", "failure"
    pub static ref EXECUTION_STATE_TRANSITION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "canary_execution_state_transition_total",
        "Total number of execution status transitions",
        &["from_status", "to_status", "status"]
    )
    .expect("canary_execution_state_transition_total metric registration");

    /// Step durations in seconds, by action and outcome
    pub static ref STEP_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "canary_step_duration_seconds",
        "Duration of executed steps",
        &["action", "status"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("canary_step_duration_seconds metric registration");

    /// Suite triggers, by outcome
    pub static ref SUITE_TRIGGER_TOTAL: IntCounterVec = register_int_counter_vec!(
        "canary_suite_trigger_total",
        "Total number of suite triggers",
        &["status"]
    )
    .expect("canary_suite_trigger_total metric registration");
}
