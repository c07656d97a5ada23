//! Announcer configuration.
//!
//! Defaults match the names the router deployment uses on the bus; every
//! value can be overridden from a TOML document or from
//! `COMMAND_ANNOUNCER_*` environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service name the router broadcasts when it starts.
pub const DEFAULT_ROUTER_SERVICE: &str = "router";
/// Broadcast group carrying service startup notifications.
pub const DEFAULT_LIFECYCLE_GROUP: &str = "serviceStartupGroup";
/// Channel the router reads administration messages from.
pub const DEFAULT_ADMIN_CHANNEL: &str = "socketIOGroup";

const ENV_ROUTER_SERVICE: &str = "COMMAND_ANNOUNCER_ROUTER_SERVICE";
const ENV_LIFECYCLE_GROUP: &str = "COMMAND_ANNOUNCER_LIFECYCLE_GROUP";
const ENV_ADMIN_CHANNEL: &str = "COMMAND_ANNOUNCER_ADMIN_CHANNEL";
const ENV_DELIVERY: &str = "COMMAND_ANNOUNCER_DELIVERY";

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// How a single triple is handed to the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Fire-and-forget `send`
    #[default]
    Send,
    /// Request/acknowledgement `rpc_send`.
    ///
    /// Each publish waits for the router's acknowledgement while the registry
    /// lock is held, so declarations and resyncs are paced by router round
    /// trips instead of being fire-and-forget.
    Rpc,
}

impl std::str::FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "send" => Ok(Self::Send),
            "rpc" => Ok(Self::Rpc),
            other => Err(ConfigError::InvalidValue {
                key: ENV_DELIVERY.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for an [`Announcer`](crate::services::announce::Announcer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnouncerConfig {
    /// Name the router announces itself with; compared case-insensitively
    pub router_service: String,
    /// Broadcast group to watch for service startups
    pub lifecycle_group: String,
    /// Channel that receives `addValidCommand` messages
    pub admin_channel: String,
    /// Delivery primitive used for each publish
    pub delivery: DeliveryMode,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            router_service: DEFAULT_ROUTER_SERVICE.to_string(),
            lifecycle_group: DEFAULT_LIFECYCLE_GROUP.to_string(),
            admin_channel: DEFAULT_ADMIN_CHANNEL.to_string(),
            delivery: DeliveryMode::Send,
        }
    }
}

impl AnnouncerConfig {
    pub fn with_router_service(mut self, name: impl Into<String>) -> Self {
        self.router_service = name.into();
        self
    }

    pub fn with_lifecycle_group(mut self, group: impl Into<String>) -> Self {
        self.lifecycle_group = group.into();
        self
    }

    pub fn with_admin_channel(mut self, channel: impl Into<String>) -> Self {
        self.admin_channel = channel.into();
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ROUTER_SERVICE) {
            config.router_service = value;
        }
        if let Some(value) = lookup(ENV_LIFECYCLE_GROUP) {
            config.lifecycle_group = value;
        }
        if let Some(value) = lookup(ENV_ADMIN_CHANNEL) {
            config.admin_channel = value;
        }
        if let Some(value) = lookup(ENV_DELIVERY) {
            config.delivery = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never match or reach the router.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router_service.trim().is_empty() {
            return Err(ConfigError::Empty("router_service"));
        }
        if self.lifecycle_group.trim().is_empty() {
            return Err(ConfigError::Empty("lifecycle_group"));
        }
        if self.admin_channel.trim().is_empty() {
            return Err(ConfigError::Empty("admin_channel"));
        }
        Ok(())
    }
}
