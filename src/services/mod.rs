//! Registry of declared commands, declaration normalization, and the announcer.

pub mod announce;
pub mod declaration;
pub mod registry;
