//! Tracing and logging setup shared by every entry point.

/// Subscriber installation (filters, formatters).
pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};

/// Install the process-wide subscriber with JSON output.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}

/// Install the process-wide subscriber with the given output format.
pub fn init_with_format(format: LogFormat) {
    tracing::init(format);
}
