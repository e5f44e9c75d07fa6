//! # Canary Core
//!
//! Core domain model for Canary test executions: action types, the status
//! lifecycle, step results and result determination, test case and suite
//! definitions.

pub mod action;
pub mod case;
pub mod principal;
pub mod status;
pub mod step;

// Re-export commonly used types
pub use action::{Action, StepDefinition};
pub use case::{Environment, ExecutionMetadata, TestCase, TestSuite};
pub use principal::Principal;
pub use status::{is_valid_transition, ExecutionStatus, StepStatus, TestResult};
pub use step::{determine_result, StepResult};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for core operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown execution status: {0}")]
    UnknownStatus(String),

    #[error("Unknown result: {0}")]
    UnknownResult(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),
}
