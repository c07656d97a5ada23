use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::stats::{AnnouncerStats, Counters, ResyncReport};
use crate::communication::{
    AddValidCommand, BusError, BusMessage, LifecycleMessage, MessageBus, MessageHandler,
    SubscriptionId,
};
use crate::core::config::{AnnouncerConfig, DeliveryMode};
use crate::services::declaration::{expand, Names, Roles};
use crate::services::registry::{Registry, Triple};

/// Errors that may occur when announcing a command to the router
#[derive(Error, Debug)]
pub enum AnnounceError {
    /// Error serializing the declaration payload
    #[error("Error serializing announcement: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bus refused or failed to deliver the message
    #[error("Error sending announcement: {0}")]
    Bus(#[from] BusError),
}

/// Restart watcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not yet subscribed to the lifecycle group
    Idle,
    /// Subscribed; router startups trigger a full resync
    Watching,
}

const IDLE: u8 = 0;
const WATCHING: u8 = 1;

/// Whether a lifecycle notification comes from the router (case-insensitive).
pub fn is_router_announcement(message: &LifecycleMessage, router_service: &str) -> bool {
    message.is_from(router_service)
}

/// Triples to publish after a router restart: the whole registry, in traversal order.
pub fn resync_plan(registry: &Registry) -> Vec<Triple> {
    registry.triples().collect()
}

/// Declares valid commands to the router and re-declares all of them
/// whenever the router restarts.
///
/// ```rust,no_run
/// use command_announcer::prelude::*;
/// use std::sync::Arc;
///
/// # async fn run(bus: Arc<dyn MessageBus>) -> command_announcer::Result<()> {
///
/// let announcer = Announcer::new(bus, AnnouncerConfig::default()).await?;
/// announcer.declare("chat", "customer", ["start", "end"]).await;
/// # Ok(())
/// # }
/// ```
///
/// Dropping an announcer leaves its lifecycle handler registered on the bus,
/// but the handler only holds a weak reference and does nothing once the
/// announcer is gone. Call [`shutdown`](Announcer::shutdown) to remove it.
#[derive(Debug)]
pub struct Announcer {
    inner: Arc<Inner>,
    subscription: SubscriptionId,
}

#[derive(Debug)]
struct Inner {
    bus: Arc<dyn MessageBus>,
    config: AnnouncerConfig,
    registry: Mutex<Registry>,
    state: AtomicU8,
    counters: Counters,
}

impl Announcer {
    /// Create an announcer with an empty registry and subscribe it to the
    /// lifecycle group. The subscription is made exactly once.
    pub async fn new(bus: Arc<dyn MessageBus>, config: AnnouncerConfig) -> crate::Result<Self> {
        config.validate()?;

        let inner = Arc::new(Inner {
            bus,
            config,
            registry: Mutex::new(Registry::new()),
            state: AtomicU8::new(IDLE),
            counters: Counters::default(),
        });

        // Weak so the bus holding the handler does not keep the announcer alive.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let handler: MessageHandler = Arc::new(move |message: BusMessage| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_lifecycle(&message).await;
                }
            }
            .boxed()
        });

        let subscription = inner
            .bus
            .subscribe(&inner.config.lifecycle_group, handler)
            .await?;
        inner.state.store(WATCHING, Ordering::SeqCst);

        info!(
            group = %inner.config.lifecycle_group,
            router = %inner.config.router_service,
            %subscription,
            "Watching for router restarts"
        );

        Ok(Self {
            inner,
            subscription,
        })
    }

    /// Declare every combination of `events`, `roles` and `commands`.
    ///
    /// Each argument may be a single value or a list. Triples not seen
    /// before are published immediately, one message each; known triples
    /// are skipped. Returns the number of new triples.
    pub async fn declare(
        &self,
        events: impl Into<Names>,
        roles: impl Into<Roles>,
        commands: impl Into<Names>,
    ) -> usize {
        let events: Names = events.into();
        let roles: Roles = roles.into();
        let commands: Names = commands.into();
        self.inner.declare(&events, &roles, &commands).await
    }

    /// Declare commands that apply regardless of role.
    pub async fn declare_command(
        &self,
        events: impl Into<Names>,
        commands: impl Into<Names>,
    ) -> usize {
        self.declare(events, Roles::any(), commands).await
    }

    /// Send one `addValidCommand` message for `triple`.
    ///
    /// The registry is not touched and failures are not retried.
    pub async fn publish(&self, triple: &Triple) -> Result<(), AnnounceError> {
        self.inner.publish(triple).await
    }

    /// Process one message from the lifecycle group. Returns the replay
    /// report when the message announced a router startup.
    pub async fn handle_lifecycle(&self, message: &BusMessage) -> Option<ResyncReport> {
        self.inner.handle_lifecycle(message).await
    }

    /// Replay every registered triple to the router.
    pub async fn resync(&self) -> ResyncReport {
        self.inner.resync().await
    }

    /// Snapshot of every registered triple, in replay order.
    pub async fn registered(&self) -> Vec<Triple> {
        resync_plan(&*self.inner.registry.lock().await)
    }

    pub fn state(&self) -> WatcherState {
        match self.inner.state.load(Ordering::SeqCst) {
            WATCHING => WatcherState::Watching,
            _ => WatcherState::Idle,
        }
    }

    pub fn stats(&self) -> AnnouncerStats {
        self.inner.counters.snapshot()
    }

    pub fn config(&self) -> &AnnouncerConfig {
        &self.inner.config
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription
    }

    /// Stop watching for router restarts and remove the handler from the bus.
    pub async fn shutdown(self) -> crate::Result<()> {
        self.inner.bus.unsubscribe(self.subscription).await?;
        self.inner.state.store(IDLE, Ordering::SeqCst);
        info!(subscription = %self.subscription, "Stopped watching for router restarts");
        Ok(())
    }
}

impl Inner {
    async fn declare(&self, events: &Names, roles: &Roles, commands: &Names) -> usize {
        // Held across record and publish so a resync cannot interleave.
        let mut registry = self.registry.lock().await;
        let mut added = 0;

        for triple in expand(events, roles, commands) {
            if !registry.record_if_absent(&triple) {
                continue;
            }
            added += 1;
            self.counters.record_triple();
            self.publish_logged(&triple).await;
        }

        if added > 0 {
            debug!(added, total = registry.len(), "Declared new commands");
        }
        added
    }

    async fn publish(&self, triple: &Triple) -> Result<(), AnnounceError> {
        let payload = AddValidCommand::from(triple).to_value()?;
        let channel = &self.config.admin_channel;

        match self.config.delivery {
            DeliveryMode::Send => self.bus.send(channel, payload).await?,
            DeliveryMode::Rpc => {
                self.bus.rpc_send(channel, payload).await?;
            }
        }
        Ok(())
    }

    /// Publish and absorb the failure; the next resync corrects it.
    async fn publish_logged(&self, triple: &Triple) -> bool {
        match self.publish(triple).await {
            Ok(()) => {
                self.counters.record_publish(true);
                debug!(%triple, "Published valid command");
                true
            }
            Err(e) => {
                self.counters.record_publish(false);
                warn!(%triple, error = %e, "Failed to publish valid command");
                false
            }
        }
    }

    async fn handle_lifecycle(&self, message: &BusMessage) -> Option<ResyncReport> {
        let lifecycle = match LifecycleMessage::from_value(&message.body) {
            Some(lifecycle) if is_router_announcement(&lifecycle, &self.config.router_service) => {
                lifecycle
            }
            other => {
                self.counters.record_ignored();
                debug!(
                    group = %message.group,
                    service = other.as_ref().and_then(|m| m.service_name()).unwrap_or("<none>"),
                    "Ignoring lifecycle message"
                );
                return None;
            }
        };

        info!(
            service = lifecycle.service_name().unwrap_or_default(),
            "Router started, replaying valid commands"
        );
        Some(self.resync().await)
    }

    async fn resync(&self) -> ResyncReport {
        // Held for the whole replay; declarations wait until it finishes.
        let registry = self.registry.lock().await;
        let mut report = ResyncReport::default();

        for triple in resync_plan(&registry) {
            if self.publish_logged(&triple).await {
                report.published += 1;
            } else {
                report.failed += 1;
            }
        }

        self.counters.record_resync(Utc::now());
        info!(
            published = report.published,
            failed = report.failed,
            "Resync complete"
        );
        report
    }
}
