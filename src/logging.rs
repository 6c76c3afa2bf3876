//! Log output.
//!
//! All diagnostics go to stderr. Stdout is reserved for the single JSON
//! result line that callers parse.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Verbosity;
use crate::error::{DocsError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity` when it is set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbosity: Verbosity) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter(verbosity))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| DocsError::other(format!("cannot initialise logging: {e}")))
}

fn filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.as_filter()))
}
