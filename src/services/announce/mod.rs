//! Command announcement to the router and restart resync.

mod announce;
mod stats;

pub use announce::*;
pub use stats::{AnnouncerStats, ResyncReport};
