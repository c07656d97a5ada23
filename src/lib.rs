//! Client-side registry of valid router commands.
//!
//! An [`Announcer`] declares `(event, role, command)` triples to a router
//! reachable only over a message bus. The router keeps no durable copy of
//! them, so whenever it broadcasts a startup notification the announcer
//! replays its whole registry.

pub mod communication;
pub mod core;
pub mod services;

pub use crate::communication::{BusError, BusMessage, MessageBus, MessageHandler};
pub use crate::core::config::{AnnouncerConfig, DeliveryMode};
pub use crate::core::error::{Error, Result};
pub use crate::services::announce::{AnnounceError, Announcer, AnnouncerStats, ResyncReport};
pub use crate::services::registry::{Registry, Triple};

/// Prelude module that re-exports the most commonly used types.
///
/// `use command_announcer::prelude::*` brings in everything needed to build
/// an announcer and declare commands.
pub mod prelude {
    pub use crate::communication::{
        BusError, BusMessage, BusResult, LifecycleMessage, MessageBus, MessageHandler,
        SubscriptionId,
    };
    #[cfg(feature = "test_utils")]
    pub use crate::communication::InMemoryBus;
    pub use crate::core::config::{AnnouncerConfig, DeliveryMode};
    pub use crate::core::error::{Error, Result};
    pub use crate::core::logging::init_module;
    pub use crate::services::announce::{
        AnnounceError, Announcer, AnnouncerStats, ResyncReport, WatcherState,
    };
    pub use crate::services::declaration::{Names, Roles};
    pub use crate::services::registry::{Registry, Triple};
}
