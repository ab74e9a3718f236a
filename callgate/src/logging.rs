//! Logging bootstrap.
//!
//! The library only emits `tracing` events. Hosts that already install a
//! subscriber need nothing from here; everyone else (notably C callers) can
//! call [`init`] once to get formatted output on stderr.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the filter directives, e.g. `callgate=debug`.
pub const LOG_ENV: &str = "CALLGATE_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a global `fmt` subscriber filtered by [`LOG_ENV`].
///
/// Returns `false` if a global subscriber was already set, in which case
/// nothing changes.
pub fn init() -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        // The first call may lose to another test; the second never wins.
        init();
        assert!(!init());
        tracing::warn!("logging initialised");
    }
}
