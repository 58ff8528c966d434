//! Engine configuration.
//!
//! Provides the tunables of the access core. Configuration is loaded from
//! environment variables with defaults matching the platform's standard
//! policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use filing_access::{ResolutionPolicy, DEFAULT_BYPASS_MAX_LEVEL};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration of the access engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Members at or below this platform level bypass rules and overrides.
    pub bypass_max_level: i32,

    /// Longest parent chain accepted in the unit tree.
    pub max_tree_depth: usize,

    /// Interval of the background expiry sweep in seconds, `0` to disable.
    pub expiry_sweep_secs: u64,

    /// Capacity of event bus channels.
    pub event_channel_capacity: usize,

    /// Log a warning when matching rules tie on priority.
    pub warn_on_priority_ties: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bypass_max_level: DEFAULT_BYPASS_MAX_LEVEL,
            max_tree_depth: 64,
            expiry_sweep_secs: 300,
            event_channel_capacity: 1024,
            warn_on_priority_ties: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FILING_BYPASS_MAX_LEVEL`: Bypass threshold (default: 2)
    /// - `FILING_MAX_TREE_DEPTH`: Maximum unit tree depth (default: 64)
    /// - `FILING_EXPIRY_SWEEP_SECS`: Expiry sweep interval, 0 disables (default: 300)
    /// - `FILING_EVENT_CHANNEL_CAPACITY`: Event channel capacity (default: 1024)
    /// - `FILING_WARN_ON_PRIORITY_TIES`: Warn on rule priority ties (default: true)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            bypass_max_level: lookup("FILING_BYPASS_MAX_LEVEL")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.bypass_max_level),
            max_tree_depth: lookup("FILING_MAX_TREE_DEPTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_tree_depth),
            expiry_sweep_secs: lookup("FILING_EXPIRY_SWEEP_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.expiry_sweep_secs),
            event_channel_capacity: lookup("FILING_EVENT_CHANNEL_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.event_channel_capacity),
            warn_on_priority_ties: lookup("FILING_WARN_ON_PRIORITY_TIES")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.warn_on_priority_ties),
        }
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tree_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FILING_MAX_TREE_DEPTH".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FILING_EVENT_CHANNEL_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Interval of the expiry sweep, `None` when disabled.
    pub fn expiry_sweep_interval(&self) -> Option<Duration> {
        (self.expiry_sweep_secs > 0).then(|| Duration::from_secs(self.expiry_sweep_secs))
    }

    /// Policy handed to the decision function.
    pub fn resolution_policy(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            bypass_max_level: self.bypass_max_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.bypass_max_level, 2);
        assert_eq!(config.max_tree_depth, 64);
        assert_eq!(config.expiry_sweep_interval(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("FILING_BYPASS_MAX_LEVEL", "1"),
            ("FILING_EXPIRY_SWEEP_SECS", "0"),
            ("FILING_WARN_ON_PRIORITY_TIES", "false"),
            ("FILING_MAX_TREE_DEPTH", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.bypass_max_level, 1);
        assert_eq!(config.expiry_sweep_interval(), None);
        assert!(!config.warn_on_priority_ties);
        assert_eq!(config.max_tree_depth, 64);
        assert_eq!(config.resolution_policy().bypass_max_level, 1);
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let config = EngineConfig {
            max_tree_depth: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
