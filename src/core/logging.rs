//! Logging setup for processes embedding the announcer.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a JSON `tracing` subscriber writing to **stderr**.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless; only the first call installs a subscriber.
pub fn init_module() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(false),
        )
        .try_init();
}
