//! Fundamental building blocks: errors, config, logging.

pub mod config;
pub mod error;
pub mod logging;
