//! Tracing setup for the `icu-forge` binary.
//!
//! Logs go to stderr; stdout is reserved for step summaries and
//! verification reports.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. HTTP client internals stay at
/// `warn` even with `--verbose`.
pub fn default_filter(level: Level) -> String {
    format!("{level},hyper=warn,reqwest=warn,rustls=warn")
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
}
