//! Tracing initialisation for Gangway binaries.
//!
//! Call [`init_tracing`] once at program start. Respects `RUST_LOG`
//! for fine-grained filtering; falls back to the supplied level when
//! it is not set. Safe to call more than once — the global subscriber
//! can only be installed once per process, so later calls are ignored.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` — emit newline-delimited JSON log lines instead of the
///   human-readable format.
/// * `level` — default verbosity when `RUST_LOG` is unset.
///
/// The HTTP client internals (`hyper`, `reqwest`) are capped at `warn`
/// by default; every registry upload would otherwise flood DEBUG runs.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper=warn,reqwest=warn")));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).compact())
            .try_init()
            .ok();
    }
}
