//! Scheduler configuration
//!
//! Values come from the environment with defaults that match the behaviour
//! users see on a fresh install.

use std::env;
use thiserror::Error;
use tracing::{info, warn};

use crate::notifications::ids::SCHEDULE_DAYS;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value was parsed but lies outside the accepted range
    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    /// A string value was empty
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Notification scheduling configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Platform channel for cycle notifications
    pub cycle_channel: String,
    /// Platform channel for medication reminders and snoozes
    pub medication_channel: String,
    /// How far a snooze pushes a medication reminder
    pub snooze_minutes: i64,
    /// Number of days scheduled ahead (at most 30, the id grid depth)
    pub schedule_days: u32,
    /// Delay before a diagnostic test notification fires
    pub test_delay_seconds: i64,
    /// Language tag for notification copy
    pub language: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_channel: "cycle-reminders".to_string(),
            medication_channel: "medication-reminders".to_string(),
            snooze_minutes: 15,
            schedule_days: SCHEDULE_DAYS,
            test_delay_seconds: 5,
            language: "en".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration from `LUNA_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let text = |key: &'static str, default: String| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(key)),
                Some(value) => Ok(value.trim().to_string()),
                None => Ok(default),
            }
        };

        let number = |key: &'static str, default: i64, min: i64, max: i64| -> Result<i64, ConfigError> {
            let value = match lookup(key).map(|raw| raw.trim().parse::<i64>()) {
                Some(Ok(value)) => value,
                Some(Err(_)) => {
                    warn!("Ignoring non-numeric {}, using default {}", key, default);
                    default
                }
                None => default,
            };

            if value < min || value > max {
                return Err(ConfigError::OutOfRange { key, min, max, value });
            }
            Ok(value)
        };

        let config = Self {
            cycle_channel: text("LUNA_CYCLE_CHANNEL", defaults.cycle_channel)?,
            medication_channel: text("LUNA_MEDICATION_CHANNEL", defaults.medication_channel)?,
            snooze_minutes: number("LUNA_SNOOZE_MINUTES", defaults.snooze_minutes, 1, 120)?,
            schedule_days: number("LUNA_SCHEDULE_DAYS", i64::from(defaults.schedule_days), 1, i64::from(SCHEDULE_DAYS))? as u32,
            test_delay_seconds: number("LUNA_TEST_DELAY_SECONDS", defaults.test_delay_seconds, 0, 3600)?,
            language: text("LUNA_LANGUAGE", defaults.language)?,
        };

        info!(
            "Scheduler configuration: schedule_days={}, snooze_minutes={}, language={}",
            config.schedule_days, config.snooze_minutes, config.language
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.schedule_days, 30);
        assert_eq!(config.snooze_minutes, 15);
    }

    #[test]
    fn test_overrides() {
        let config = SchedulerConfig::from_lookup(lookup(&[
            ("LUNA_SNOOZE_MINUTES", "10"),
            ("LUNA_SCHEDULE_DAYS", "7"),
            ("LUNA_LANGUAGE", "es"),
        ]))
        .unwrap();
        assert_eq!(config.snooze_minutes, 10);
        assert_eq!(config.schedule_days, 7);
        assert_eq!(config.language, "es");
    }

    #[test]
    fn test_non_numeric_falls_back() {
        let config = SchedulerConfig::from_lookup(lookup(&[("LUNA_SNOOZE_MINUTES", "soon")])).unwrap();
        assert_eq!(config.snooze_minutes, 15);
    }

    #[test]
    fn test_schedule_days_beyond_grid_rejected() {
        let result = SchedulerConfig::from_lookup(lookup(&[("LUNA_SCHEDULE_DAYS", "45")]));
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange { key: "LUNA_SCHEDULE_DAYS", .. })
        ));
    }

    #[test]
    fn test_empty_channel_rejected() {
        let result = SchedulerConfig::from_lookup(lookup(&[("LUNA_CYCLE_CHANNEL", "  ")]));
        assert_eq!(result, Err(ConfigError::Empty("LUNA_CYCLE_CHANNEL")));
    }
}
