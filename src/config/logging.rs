//! Logging configuration and initialization.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Every log target the crate emits on, at INFO, everything else at WARN.
pub const DEFAULT_FILTER: &str = "xsent=info,engine=info,ingest=info,scoring=info,exchange=info,warn";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when RUST_LOG is not set.
    pub level: String,
    /// "compact" (default) or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_FILTER.into(),
            format: "compact".into(),
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber. Safe to call more than once; later calls
    /// are no-ops (the Shuttle runtime may already have installed one).
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| self.filter());

        let res = match self.format.to_ascii_lowercase().as_str() {
            "json" => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init(),
            _ => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init(),
        };
        if res.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }

    /// Filter built from `level`, ignoring RUST_LOG.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(&self.level)
    }
}
