//! Process-wide tracing/logging setup shared by the service binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide tracing for `service`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(service: &str) {
    tracing::init(service, LogFormat::from_env());
}
