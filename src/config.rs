//! # Lifecycle run configuration.
//!
//! [`LifecycleConfig`] describes one run of the timed names observable: which
//! values are emitted and when, when the external unsubscribe fires, whether
//! pending timers are cancelled on close, and which clock drives the run.
//!
//! Defaults reproduce the reference run. A TOML file can override any field:
//!
//! ```toml
//! unsubscribe_after_ms = 1000
//! cancel_pending = false
//! clock = "virtual"
//!
//! [[emissions]]
//! value = "Mahathi"
//!
//! [[emissions]]
//! value = "Chenchu Lakshmi"
//! delay_ms = 2000
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::errors::ConfigError;

/// Which clock drives the timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clock {
    /// Timers fire after their delay has elapsed on the `Tokio` clock.
    #[default]
    Realtime,
    /// Timers fire back to back on a virtual clock; output is identical.
    Virtual,
}

/// One value the producer pushes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Emission {
    pub value: String,
    /// `None` pushes during activation. `Some(0)` schedules a zero-delay timer.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl Emission {
    pub fn immediate(value: impl Into<String>) -> Self {
        Emission {
            value: value.into(),
            delay_ms: None,
        }
    }

    pub fn delayed(value: impl Into<String>, delay_ms: u64) -> Self {
        Emission {
            value: value.into(),
            delay_ms: Some(delay_ms),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub unsubscribe_after_ms: u64,
    pub emissions: Vec<Emission>,
    /// Cancel the producer's pending timers when the subscription closes. When
    /// disabled the timers still fire and the closed channel drops their values.
    pub cancel_pending: bool,
    pub clock: Clock,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            unsubscribe_after_ms: 3000,
            emissions: vec![
                Emission::immediate("Mahathi"),
                Emission::delayed("Chenchu Lakshmi", 2000),
                Emission::delayed("Mahi Chenchith", 4000),
            ],
            cancel_pending: true,
            clock: Clock::Realtime,
        }
    }
}

impl LifecycleConfig {
    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid TOML for
    /// this structure, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when there is nothing to emit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.emissions.is_empty() {
            return Err(ConfigError::Invalid("at least one emission is required".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn unsubscribe_after(&self) -> Duration {
        Duration::from_millis(self.unsubscribe_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = LifecycleConfig::default();

        assert_eq!(config.unsubscribe_after(), Duration::from_millis(3000));
        assert_eq!(config.emissions[0].delay(), None);
        assert_eq!(config.emissions[1].delay(), Some(Duration::from_millis(2000)));
        assert_eq!(config.emissions[2].delay(), Some(Duration::from_millis(4000)));
        assert!(config.cancel_pending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: LifecycleConfig = toml::from_str(
            r#"
            unsubscribe_after_ms = 1000
            clock = "virtual"
            "#,
        )
        .unwrap();

        assert_eq!(config.unsubscribe_after_ms, 1000);
        assert_eq!(config.clock, Clock::Virtual);
        assert_eq!(config.emissions, LifecycleConfig::default().emissions);
    }

    #[test]
    fn emissions_table_replaces_defaults() {
        let config: LifecycleConfig = toml::from_str(
            r#"
            [[emissions]]
            value = "now"

            [[emissions]]
            value = "later"
            delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(
            config.emissions,
            vec![Emission::immediate("now"), Emission::delayed("later", 0)]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = toml::from_str::<LifecycleConfig>("unsubscribe_after = 5");
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_emissions_fail_validation() {
        let config = LifecycleConfig {
            emissions: Vec::new(),
            ..LifecycleConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LifecycleConfig::load("/nonexistent/lifecycle.toml").unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("lifecycle.toml"));
    }
}
