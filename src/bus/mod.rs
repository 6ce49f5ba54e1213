//! Topic-keyed event bus between the task create path and the executor.
//!
//! The contract is at-least-once: `publish` returns only once the message is
//! durably appended to the topic, and consumers start from the earliest
//! offset, so a message published before the consumer comes up is still
//! delivered. Handler errors are logged and the offset advances regardless;
//! redelivery on handler failure is not provided.

use crate::error::Result;
use crate::types::TaskId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod memory;

pub use memory::InProcessBus;

/// Topic carrying one message per created download task
pub const TOPIC_DOWNLOAD_TASK_CREATED: &str = "download.task.created";

/// Payload of [`TOPIC_DOWNLOAD_TASK_CREATED`] messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreatedEvent {
    /// ID of the task that was created
    pub id: TaskId,
}

/// Callback invoked for each consumed message
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one message; errors are logged by the bus and not retried
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Topic-keyed publish/consume
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Append a message to the topic; returns once durably appended
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Register the handler for a topic; takes effect at the next [`EventBus::start`]
    async fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>);

    /// Spawn one consumer worker per subscribed topic, each reading from the
    /// earliest offset; workers exit when `cancel` fires
    async fn start(&self, cancel: CancellationToken);
}
