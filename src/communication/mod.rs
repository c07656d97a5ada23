//! Message bus wiring: the client abstraction and the messages exchanged over it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod message;
#[cfg(any(test, feature = "test_utils"))]
pub mod in_memory;

#[cfg(any(test, feature = "test_utils"))]
pub use in_memory::{InMemoryBus, SentMessage};
pub use message::{AddValidCommand, LifecycleBody, LifecycleMessage, ADD_VALID_COMMAND_URI};

/// Result type for bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Errors surfaced by a [`MessageBus`] implementation.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No active subscription {0}")]
    NotSubscribed(SubscriptionId),

    #[error("Bus connection closed")]
    Closed,
}

/// An inbound message delivered for a joined broadcast group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Group the message was broadcast on
    pub group: String,
    /// Structured message body
    pub body: serde_json::Value,
}

impl BusMessage {
    pub fn new(group: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            group: group.into(),
            body,
        }
    }
}

/// Handler invoked by the bus for every message on a subscribed group.
///
/// The returned future is awaited to completion before the bus hands the
/// handler its next message.
pub type MessageHandler = Arc<dyn Fn(BusMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Identifies a handler registration returned by [`MessageBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client handle for the message bus the router listens on.
///
/// Connection setup, authentication and delivery guarantees belong to the
/// implementation; the announcer only joins groups and sends payloads.
#[async_trait]
pub trait MessageBus: Send + Sync + fmt::Debug {
    /// Join a broadcast group and register a handler for its messages.
    ///
    /// The handler stays registered until [`unsubscribe`](Self::unsubscribe)
    /// is called with the returned id.
    async fn subscribe(&self, group: &str, handler: MessageHandler) -> BusResult<SubscriptionId>;

    /// Remove a handler registered by [`subscribe`](Self::subscribe).
    async fn unsubscribe(&self, id: SubscriptionId) -> BusResult<()>;

    /// Best-effort, fire-and-forget delivery of a payload to a channel.
    async fn send(&self, channel: &str, payload: serde_json::Value) -> BusResult<()>;

    /// Request/acknowledgement delivery. Buses without an acknowledgement
    /// primitive fall back to [`send`](Self::send) and reply with `Null`.
    async fn rpc_send(
        &self,
        channel: &str,
        payload: serde_json::Value,
    ) -> BusResult<serde_json::Value> {
        self.send(channel, payload).await?;
        Ok(serde_json::Value::Null)
    }
}

#[async_trait]
impl<B> MessageBus for Arc<B>
where
    B: MessageBus + ?Sized,
{
    async fn subscribe(&self, group: &str, handler: MessageHandler) -> BusResult<SubscriptionId> {
        (**self).subscribe(group, handler).await
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> BusResult<()> {
        (**self).unsubscribe(id).await
    }

    async fn send(&self, channel: &str, payload: serde_json::Value) -> BusResult<()> {
        (**self).send(channel, payload).await
    }

    async fn rpc_send(
        &self,
        channel: &str,
        payload: serde_json::Value,
    ) -> BusResult<serde_json::Value> {
        (**self).rpc_send(channel, payload).await
    }
}
