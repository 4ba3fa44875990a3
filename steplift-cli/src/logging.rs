//! Logging initialization: diagnostics go to stderr, stdout carries command output only.
//!
//! Reads `RUST_LOG` for the level filter, e.g. `debug` or `steplift_core=debug`.
//! Default: `warn`, which surfaces skipped corpus files and cache load failures.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    // A subscriber may already be installed when embedded; keep that one
    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}
