//! In-process event bus.
//!
//! Each topic is an append-only message log plus a wakeup. A consumer worker
//! tracks its own offset into the log, so messages published before the
//! worker starts are replayed from the beginning (earliest offset), and a
//! message is never handed to the handler twice by the same worker.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use super::{EventBus, EventHandler};

#[derive(Default)]
struct TopicState {
    log: Mutex<Vec<Vec<u8>>>,
    wakeup: Notify,
}

/// In-process implementation of [`EventBus`]
#[derive(Default)]
pub struct InProcessBus {
    topics: Mutex<HashMap<String, Arc<TopicState>>>,
    handlers: Mutex<HashMap<String, Arc<dyn EventHandler>>>,
}

impl InProcessBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    async fn topic_state(&self, topic: &str) -> Arc<TopicState> {
        let mut topics = self.topics.lock().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TopicState::default()))
            .clone()
    }
}

#[async_trait]
impl EventBus for InProcessBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::Bus("topic must not be empty".to_string()));
        }

        let state = self.topic_state(topic).await;
        state.log.lock().await.push(payload);
        // notify_one stores a permit, so a publish landing between the
        // worker's length check and its wait is not lost
        state.wakeup.notify_one();
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .lock()
            .await
            .insert(topic.to_string(), handler);
    }

    async fn start(&self, cancel: CancellationToken) {
        let handlers: Vec<(String, Arc<dyn EventHandler>)> = self
            .handlers
            .lock()
            .await
            .iter()
            .map(|(topic, handler)| (topic.clone(), handler.clone()))
            .collect();

        for (topic, handler) in handlers {
            let state = self.topic_state(&topic).await;
            let cancel = cancel.clone();
            tokio::spawn(consume_topic(topic, state, handler, cancel));
        }
    }
}

/// Per-topic consumer worker: drain the log from the earliest offset,
/// then wait for publishes or cancellation.
async fn consume_topic(
    topic: String,
    state: Arc<TopicState>,
    handler: Arc<dyn EventHandler>,
    cancel: CancellationToken,
) {
    let mut offset = 0usize;

    loop {
        let next = {
            let log = state.log.lock().await;
            log.get(offset).cloned()
        };

        match next {
            Some(payload) => {
                offset += 1;
                if let Err(e) = handler.handle(&topic, &payload).await {
                    // At-least-once up to the poll only: the offset advances
                    // whether or not the handler succeeded
                    tracing::error!(topic = %topic, error = %e, "event handler failed");
                }
            }
            None => {
                tokio::select! {
                    _ = state.wakeup.notified() => {}
                    _ = cancel.cancelled() => {
                        tracing::debug!(topic = %topic, "consumer worker stopping");
                        return;
                    }
                }
            }
        }
    }
}
