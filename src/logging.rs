//! Diagnostic tracing for nxm.
//!
//! Command results and streamed child output go to stdout. Diagnostics go to
//! stderr through `tracing`, filtered by `NXM_LOG` (or `RUST_LOG`).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "NXM_LOG";

/// Initialize the tracing subscriber.
///
/// Reads `NXM_LOG`, then `RUST_LOG`. Defaults to `warn` if neither is set.
///
/// ```bash
/// NXM_LOG=nxm=debug nxm switch --dry-run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (e.g. from tests) is harmless, so the error is dropped.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
