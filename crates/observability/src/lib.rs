//! Process-wide tracing setup shared by the binaries.

/// Subscriber configuration (format, filters).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat, ParseLogFormatError};

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    crate::tracing::init(&LogConfig::default());
}

/// Initialize logging with an explicit configuration.
pub fn init_with(config: &LogConfig) {
    crate::tracing::init(config);
}
