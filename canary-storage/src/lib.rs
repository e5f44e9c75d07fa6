//! # Canary Storage
//!
//! Durable execution records for Canary, stored in PostgreSQL with
//! row-level security for organization isolation. An in-memory backend
//! with identical semantics backs tests and local mode.

pub mod history;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod org;
pub mod postgres;
pub mod store;

// Re-export commonly used types
pub use history::ExecutionQuery;
pub use memory::MemoryStore;
pub use models::{ExecutionModel, TestCaseModel, TestSuiteModel};
pub use org::OrgId;
pub use postgres::PostgresStorage;
pub use sqlx::types::Json;
pub use store::RecordStore;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Organization isolation violation: {0}")]
    OrgViolation(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
