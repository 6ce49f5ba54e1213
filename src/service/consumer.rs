//! Bus consumer wiring for the task executor.

use crate::bus::{EventBus, EventHandler, TaskCreatedEvent, TOPIC_DOWNLOAD_TASK_CREATED};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::TaskService;

/// Handles `download.task.created` messages by executing the task.
struct TaskCreatedHandler {
    service: Arc<TaskService>,
    cancel: CancellationToken,
}

#[async_trait]
impl EventHandler for TaskCreatedHandler {
    async fn handle(&self, _topic: &str, payload: &[u8]) -> Result<()> {
        let event: TaskCreatedEvent = serde_json::from_slice(payload)?;
        self.service.execute(&self.cancel, event.id).await
    }
}

/// Subscribe the executor to the task-created topic.
///
/// `cancel` is handed to every execution so in-flight downloads unwind on
/// shutdown.
pub async fn register_task_consumer(
    bus: &dyn EventBus,
    service: Arc<TaskService>,
    cancel: CancellationToken,
) {
    bus.subscribe(
        TOPIC_DOWNLOAD_TASK_CREATED,
        Arc::new(TaskCreatedHandler { service, cancel }),
    )
    .await;
}
