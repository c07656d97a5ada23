//! Payloads exchanged with the router over the bus.

use serde::{Deserialize, Serialize};

use crate::services::registry::Triple;

/// `uri` value the router dispatches command declarations on.
pub const ADD_VALID_COMMAND_URI: &str = "addValidCommand";

/// Startup notification broadcast by a service on the lifecycle group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMessage {
    #[serde(default)]
    pub body: LifecycleBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleBody {
    /// Name of the service that just started
    #[serde(default)]
    pub micro_service_name: Option<String>,
}

impl LifecycleMessage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            body: LifecycleBody {
                micro_service_name: Some(service.into()),
            },
        }
    }

    /// Parse an inbound message. Anything that is not shaped like a
    /// lifecycle notification yields `None`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.body.micro_service_name.as_deref()
    }

    /// Case-insensitive comparison against a service identifier.
    pub fn is_from(&self, service: &str) -> bool {
        self.service_name()
            .is_some_and(|name| name.to_lowercase() == service.to_lowercase())
    }
}

/// Declaration of one valid command, sent to the router's admin channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddValidCommand {
    pub uri: String,
    pub event: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl AddValidCommand {
    pub fn new(
        event: impl Into<String>,
        role: Option<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            uri: ADD_VALID_COMMAND_URI.to_string(),
            event: event.into(),
            command: command.into(),
            role,
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<&Triple> for AddValidCommand {
    fn from(triple: &Triple) -> Self {
        Self::new(triple.event.clone(), triple.role.clone(), triple.command.clone())
    }
}
