//! Tracing subscriber setup.

use crate::config::EngineConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber when the config enables it.
///
/// When `tracing_enabled` is false nothing is constructed. Returns true if a
/// subscriber was installed; false when tracing is disabled or a subscriber
/// was already set (tests install their own).
pub fn init_tracing(config: &EngineConfig) -> bool {
    if !config.tracing_enabled {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_installs_nothing() {
        let config = EngineConfig::default();
        assert!(!init_tracing(&config));
    }
}
