//! Tracing and logging (shared setup).

pub use crate::tracing::LogSettings;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init();
}

/// Same as [`init`], driven by explicit settings instead of defaults.
pub fn init_with(settings: &LogSettings) {
    crate::tracing::init_with(settings);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
