//! Engine configuration.
//!
//! All runtime knobs are resolved at startup. Tracing in particular is a
//! plain boolean here: when disabled the subscriber is never constructed, no
//! capability probing happens at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether to install the tracing subscriber at startup.
    pub tracing_enabled: bool,
    /// Per-provider timeout for shipping rate fan-out, in milliseconds.
    pub provider_timeout_ms: u64,
    /// Default page size for dead-letter inspection.
    pub dlq_default_limit: usize,
    /// Default retention for failed jobs, in days.
    pub dlq_retention_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracing_enabled: false,
            provider_timeout_ms: 5_000,
            dlq_default_limit: 50,
            dlq_retention_days: 30,
        }
    }
}

impl EngineConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables tracing.
    #[must_use]
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    /// Sets the per-provider timeout.
    #[must_use]
    pub fn with_provider_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.provider_timeout_ms = timeout_ms;
        self
    }

    /// Sets the default dead-letter page size.
    #[must_use]
    pub fn with_dlq_default_limit(mut self, limit: usize) -> Self {
        self.dlq_default_limit = limit;
        self
    }

    /// Sets the failed-job retention window.
    #[must_use]
    pub fn with_dlq_retention_days(mut self, days: i64) -> Self {
        self.dlq_retention_days = days;
        self
    }

    /// The per-provider timeout as a [`Duration`].
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}
