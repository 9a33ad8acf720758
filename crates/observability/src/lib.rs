//! Shared tracing setup for binaries and tests using `equate-core`.
//!
//! The core crate only emits `tracing` events (factory builds at `debug`,
//! rejected configurations at `warn`, member selection at `trace`); this crate
//! installs the subscriber that renders them.

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize tracing with an explicit filter instead of `RUST_LOG`.
pub fn init_with_filter(directives: &str) {
    tracing::init_with_filter(directives);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
