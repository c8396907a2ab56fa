//! Polling configuration stored in profiles
//!
//! `[profiles.<name>.polling]` tables deserialize into [`PollingConfig`],
//! which converts into the [`PollSettings`] a poll session runs with.

use super::error::{ConfigError, Result};
use crate::poller::{DEFAULT_DEADLINE, DEFAULT_POLL_INTERVAL, PollSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll cadence and deadline, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between status queries
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait for a terminal state before reporting a timeout
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Upper bound for a single status query, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_call_timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            deadline_secs: default_deadline_secs(),
            per_call_timeout_secs: None,
        }
    }
}

impl PollingConfig {
    /// Apply command-line overrides
    pub fn with_overrides(mut self, interval_secs: Option<u64>, deadline_secs: Option<u64>) -> Self {
        if let Some(interval) = interval_secs {
            self.interval_secs = interval;
        }
        if let Some(deadline) = deadline_secs {
            self.deadline_secs = deadline;
        }
        self
    }

    /// Convert to poll settings
    ///
    /// A zero interval or per-call timeout is rejected: the first would
    /// query back-to-back, the second would never let a query finish. A zero
    /// deadline is allowed and times out before the first query.
    pub fn to_settings(&self) -> Result<PollSettings> {
        if self.interval_secs == 0 {
            return Err(invalid("interval_secs"));
        }
        let mut settings = PollSettings::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(self.deadline_secs),
        );
        if let Some(secs) = self.per_call_timeout_secs {
            if secs == 0 {
                return Err(invalid("per_call_timeout_secs"));
            }
            settings = settings.with_per_call_timeout(Duration::from_secs(secs));
        }
        Ok(settings)
    }
}

// Default value functions for serde
fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE.as_secs()
}

fn invalid(field: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: "must be at least 1 second".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_poller_defaults() {
        assert_eq!(
            PollingConfig::default().to_settings().unwrap(),
            PollSettings::default()
        );
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let config: PollingConfig = toml::from_str("deadline_secs = 600").unwrap();
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.deadline_secs, 600);
        assert!(config.per_call_timeout_secs.is_none());
    }

    #[test]
    fn test_overrides_and_per_call_timeout() {
        let config = PollingConfig {
            per_call_timeout_secs: Some(15),
            ..Default::default()
        }
        .with_overrides(Some(5), None);

        let settings = config.to_settings().unwrap();
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.deadline, Duration::from_secs(120));
        assert_eq!(settings.per_call_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = PollingConfig::default()
            .with_overrides(Some(0), None)
            .to_settings()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "interval_secs"
        ));
    }

    #[test]
    fn test_zero_per_call_timeout_is_rejected() {
        let config = PollingConfig {
            per_call_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.to_settings(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "per_call_timeout_secs"
        ));
    }

    #[test]
    fn test_zero_deadline_is_allowed() {
        let settings = PollingConfig::default()
            .with_overrides(None, Some(0))
            .to_settings()
            .unwrap();
        assert!(settings.deadline.is_zero());
    }
}
