//! Poller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PollerError, Result};

/// Default wait between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable holding the poll interval (humantime, e.g. `500ms`).
pub const ENV_POLL_INTERVAL: &str = "LRO_POLL_INTERVAL";
/// Environment variable holding the per-poll timeout.
pub const ENV_POLL_TIMEOUT: &str = "LRO_POLL_TIMEOUT";
/// Environment variable holding the overall wait timeout.
pub const ENV_OVERALL_TIMEOUT: &str = "LRO_OVERALL_TIMEOUT";
/// Environment variable selecting `lazy` or `eager` activation.
pub const ENV_ACTIVATION: &str = "LRO_ACTIVATION";

/// When the activation callback runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// On first subscription or first poll request.
    #[default]
    Lazy,
    /// While the blocking facade is being constructed.
    Eager,
}

/// Configuration shared by the async poller and the blocking facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Wait between polls unless a response suggests its own delay.
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub poll_interval: Duration,
    /// When activation runs.
    pub activation: ActivationMode,
    /// Default per-poll bound for blocking waits.
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub poll_timeout: Option<Duration>,
    /// Default overall bound for blocking waits.
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub overall_timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            activation: ActivationMode::Lazy,
            poll_timeout: None,
            overall_timeout: None,
        }
    }
}

impl PollerConfig {
    /// Create a configuration with the given poll interval
    #[must_use]
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    /// Read overrides from `LRO_*` environment variables on top of defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(interval) = parse_duration_var(&lookup, ENV_POLL_INTERVAL)? {
            config.poll_interval = interval;
        }
        config.poll_timeout = parse_duration_var(&lookup, ENV_POLL_TIMEOUT)?;
        config.overall_timeout = parse_duration_var(&lookup, ENV_OVERALL_TIMEOUT)?;
        if let Some(mode) = lookup(ENV_ACTIVATION) {
            config.activation = match mode.trim().to_ascii_lowercase().as_str() {
                "lazy" => ActivationMode::Lazy,
                "eager" => ActivationMode::Eager,
                other => {
                    return Err(PollerError::invalid_argument(format!(
                        "{ENV_ACTIVATION} must be 'lazy' or 'eager', got '{other}'"
                    )));
                }
            };
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_poll_interval(self.poll_interval)?;
        self.wait_options().validate()
    }

    /// Default timeouts for blocking waits
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_timeout: self.poll_timeout,
            overall_timeout: self.overall_timeout,
        }
    }
}

pub(crate) fn validate_poll_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(PollerError::invalid_argument(
            "poll interval must be greater than zero",
        ));
    }
    Ok(())
}

fn parse_duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>> {
    lookup(key)
        .map(|raw| {
            humantime::parse_duration(raw.trim()).map_err(|e| {
                PollerError::invalid_argument(format!("{key} is not a valid duration: {e}"))
            })
        })
        .transpose()
}

/// Timeout axes of one blocking wait. Unset axes are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// Bound on a single poll, including the wait before it.
    pub poll_timeout: Option<Duration>,
    /// Bound on the whole wait.
    pub overall_timeout: Option<Duration>,
}

impl WaitOptions {
    /// No timeouts
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_timeout: None,
            overall_timeout: None,
        }
    }

    /// Bound every single poll
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Bound the whole wait
    #[must_use]
    pub const fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = Some(timeout);
        self
    }

    pub(crate) fn or(self, fallback: Self) -> Self {
        Self {
            poll_timeout: self.poll_timeout.or(fallback.poll_timeout),
            overall_timeout: self.overall_timeout.or(fallback.overall_timeout),
        }
    }

    /// Validate that every configured bound is positive
    pub fn validate(&self) -> Result<()> {
        for (name, timeout) in [
            ("poll timeout", self.poll_timeout),
            ("overall timeout", self.overall_timeout),
        ] {
            if timeout.is_some_and(|t| t.is_zero()) {
                return Err(PollerError::invalid_argument(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = PollerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.activation, ActivationMode::Lazy);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = PollerConfig::with_poll_interval(Duration::ZERO);
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let options = WaitOptions::new().with_poll_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = PollerConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL, "250ms"),
            (ENV_OVERALL_TIMEOUT, "2m"),
            (ENV_ACTIVATION, "Eager"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.poll_timeout, None);
        assert_eq!(config.overall_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.activation, ActivationMode::Eager);
    }

    #[test]
    fn env_rejects_garbage() {
        assert!(PollerConfig::from_lookup(lookup(&[(ENV_POLL_TIMEOUT, "soon")])).is_err());
        assert!(PollerConfig::from_lookup(lookup(&[(ENV_ACTIVATION, "later")])).is_err());
        assert!(PollerConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "0s")])).is_err());
    }

    #[test]
    fn explicit_options_win_over_defaults() {
        let defaults = WaitOptions::new()
            .with_poll_timeout(Duration::from_secs(1))
            .with_overall_timeout(Duration::from_secs(10));
        let merged = WaitOptions::new()
            .with_poll_timeout(Duration::from_millis(100))
            .or(defaults);

        assert_eq!(merged.poll_timeout, Some(Duration::from_millis(100)));
        assert_eq!(merged.overall_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PollerConfig = serde_json::from_str(r#"{"activation":"eager"}"#).unwrap();
        assert_eq!(config.activation, ActivationMode::Eager);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }
}
