//! Tracing/logging initialization.
//!
//! `RUST_LOG` always wins over the configured level so operators can raise
//! verbosity without touching config files.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log output settings, usually embedded in the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset (e.g. `info`, `wareflow_engine=debug`).
    pub level: String,
    /// JSON lines when true, human-readable output otherwise.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl LogSettings {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&LogSettings::default());
}

pub fn init_with(settings: &LogSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // A second subscriber is refused by the registry; that is fine.
    let _ = if settings.json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
}
