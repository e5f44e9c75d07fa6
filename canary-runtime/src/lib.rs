//! # Canary Runtime
//!
//! Execution engine for Canary test runs: the status state machine, the
//! retry executor, the step executor, the time-budget governor, and the
//! single-execution and suite orchestrators.

pub mod budget;
pub mod driver;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod retry;
pub mod state_machine;
pub mod step_executor;
pub mod suite;

// Re-export commonly used types
pub use budget::{BudgetGovernor, StepTimeouts};
pub use driver::{ActionOutcome, AutomationDriver, ExecutionContext, ScreenshotStore};
pub use orchestrator::ExecutionOrchestrator;
pub use queue::{ExecutionMessage, ExecutionQueue, LocalQueue};
pub use retry::{retry, retry_safe, RetryOutcome, RetryPolicy};
pub use state_machine::StateMachine;
pub use step_executor::{StepExecutor, StepRun};
pub use suite::{SuiteExecution, SuiteOrchestrator, SuiteStats, SuiteTrigger};

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Insufficient time remaining: {0}")]
    InsufficientTime(String),

    #[error("Enqueue error: {0}")]
    Enqueue(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
