//! Tracing and logging (shared setup).

use std::path::PathBuf;

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::ObservabilityError;

/// Process-wide logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Also append JSON log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            file: None,
        }
    }
}

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LogConfig) -> Result<(), ObservabilityError> {
    self::tracing::init(config)
}
