//! Execution queue abstraction
//!
//! The suite orchestrator fans each member out as one independent unit of
//! work through this seam. Delivery is at-least-once from the core's
//! perspective; consumers must be idempotent on `execution_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Result type for enqueue operations
pub type EnqueueResult<T> = std::result::Result<T, EnqueueError>;

/// Errors that can occur while enqueueing an execution
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Queue API error: {0}")]
    QueueApi(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One message per queued test case execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMessage {
    /// UUID of the execution record in storage
    pub execution_id: Uuid,

    /// Test case to run; absent for ad-hoc executions carrying inline steps
    pub test_case_id: Option<Uuid>,

    /// Project the execution belongs to
    pub project_id: Uuid,

    /// Organization scoping for the consumer's storage access
    pub organization_id: String,

    /// Present when the execution is part of a suite trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_execution_id: Option<Uuid>,
}

/// Abstraction for dispatching queued executions to workers
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
    /// Enqueue one execution for asynchronous processing
    ///
    /// Returns a queue-assigned message identifier for tracking.
    async fn enqueue(&self, message: ExecutionMessage) -> EnqueueResult<String>;
}

/// In-process queue for local mode and tests
///
/// Messages are delivered over an unbounded channel to whatever consumer
/// holds the receiver; nothing executes inside the trigger path itself.
pub struct LocalQueue {
    tx: mpsc::UnboundedSender<ExecutionMessage>,
}

impl LocalQueue {
    /// Create the queue and its consumer end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ExecutionQueue for LocalQueue {
    async fn enqueue(&self, message: ExecutionMessage) -> EnqueueResult<String> {
        let id = message.execution_id.to_string();
        self.tx
            .send(message)
            .map_err(|e| EnqueueError::QueueApi(format!("local queue closed: {}", e)))?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ExecutionMessage {
        ExecutionMessage {
            execution_id: Uuid::new_v4(),
            test_case_id: Some(Uuid::new_v4()),
            project_id: Uuid::new_v4(),
            organization_id: "org-1".to_string(),
            suite_execution_id: None,
        }
    }

    #[tokio::test]
    async fn test_local_queue_delivers() {
        let (queue, mut rx) = LocalQueue::new();
        let sent = message();

        let id = queue.enqueue(sent.clone()).await.unwrap();
        assert_eq!(id, sent.execution_id.to_string());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.execution_id, sent.execution_id);
    }

    #[tokio::test]
    async fn test_closed_queue_reports_error() {
        let (queue, rx) = LocalQueue::new();
        drop(rx);

        let result = queue.enqueue(message()).await;
        assert!(matches!(result, Err(EnqueueError::QueueApi(_))));
    }

    #[test]
    fn test_message_serialization() {
        let sent = message();
        let json = serde_json::to_string(&sent).unwrap();
        let back: ExecutionMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.execution_id, sent.execution_id);
        assert_eq!(back.organization_id, sent.organization_id);
    }
}
