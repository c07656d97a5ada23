//! In-process bus for tests and local development.
//!
//! - Records every outbound message in send order
//! - Delivers inbound messages to each group handler in turn, awaiting each to completion
//! - Can be switched into a failing mode to exercise transport errors
//! - Can be closed, after which every operation fails with [`BusError::Closed`]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{BusError, BusMessage, BusResult, MessageBus, MessageHandler, SubscriptionId};

/// An outbound message captured by [`InMemoryBus`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel: String,
    pub payload: serde_json::Value,
    /// Whether the message went through `rpc_send`
    pub rpc: bool,
}

#[derive(Default)]
pub struct InMemoryBus {
    handlers: DashMap<String, Vec<(SubscriptionId, MessageHandler)>>,
    sent: Mutex<Vec<SentMessage>>,
    subscribe_calls: AtomicUsize,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("InMemoryBus")
            .field("groups", &groups)
            .field("fail_sends", &self.fail_sends.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast `body` on `group`, running every registered handler to completion.
    ///
    /// Returns the number of handlers that received the message.
    pub async fn deliver(&self, group: &str, body: serde_json::Value) -> usize {
        let handlers: Vec<MessageHandler> = self
            .handlers
            .get(group)
            .map(|entry| entry.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();

        debug!(group, handlers = handlers.len(), "Delivering broadcast");

        for handler in &handlers {
            handler(BusMessage::new(group, body.clone())).await;
        }
        handlers.len()
    }

    /// Every message sent so far, oldest first.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Payloads sent to `channel`, oldest first.
    pub async fn sent_to(&self, channel: &str) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Forget recorded outbound messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Number of handlers registered for `group`.
    pub fn subscriber_count(&self, group: &str) -> usize {
        self.handlers.get(group).map(|entry| entry.len()).unwrap_or(0)
    }

    /// Total number of `subscribe` calls received.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent sends fail with a transport error (nothing is recorded).
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Shut the bus down: drop every handler and refuse further operations.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.handlers.clear();
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        Ok(())
    }

    async fn record(&self, channel: &str, payload: serde_json::Value, rpc: bool) -> BusResult<()> {
        self.ensure_open()?;
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BusError::Transport(format!("send to {channel} refused")));
        }
        self.sent.lock().await.push(SentMessage {
            channel: channel.to_string(),
            payload,
            rpc,
        });
        Ok(())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn subscribe(&self, group: &str, handler: MessageHandler) -> BusResult<SubscriptionId> {
        self.ensure_open()?;
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let id = SubscriptionId::new();
        self.handlers
            .entry(group.to_string())
            .or_default()
            .push((id, handler));
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> BusResult<()> {
        self.ensure_open()?;
        let mut removed = false;
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|(sub, _)| *sub != id);
            removed |= entry.len() != before;
        }
        self.handlers.retain(|_, handlers| !handlers.is_empty());

        if removed {
            Ok(())
        } else {
            Err(BusError::NotSubscribed(id))
        }
    }

    async fn send(&self, channel: &str, payload: serde_json::Value) -> BusResult<()> {
        self.record(channel, payload, false).await
    }

    async fn rpc_send(
        &self,
        channel: &str,
        payload: serde_json::Value,
    ) -> BusResult<serde_json::Value> {
        self.record(channel, payload, true).await?;
        Ok(serde_json::json!({ "ok": true }))
    }
}
