//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize tracing from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Initialize tracing with the given filter directives, e.g.
/// `"equate_core=trace"`.
pub fn init_with_filter(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

fn install(filter: EnvFilter) {
    let directives = filter.to_string();
    // JSON lines with timestamps; the event target names the emitting module.
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .try_init()
        .is_ok();
    if installed {
        ::tracing::debug!(filter = %directives, "tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_a_no_op() {
        init_with_filter("equate_core=trace");
        init();
        init_with_filter("not a [valid filter");
        ::tracing::info!(target: "equate_core::factory", "still logging");
    }
}
