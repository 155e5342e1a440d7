//! Tracing and logging setup shared by the catalog binaries.

/// Initialize process-wide tracing with the given output format and default
/// filter directive.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(format: LogFormat, default_level: &str) {
    tracing::init(format, default_level);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
