use thiserror::Error;

use crate::communication::BusError;
use crate::core::config::ConfigError;
use crate::services::announce::AnnounceError;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Message bus failure while subscribing or sending
    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    /// Failure announcing a command to the router
    #[error("Announce error: {0}")]
    Announce(#[from] AnnounceError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenient result alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
