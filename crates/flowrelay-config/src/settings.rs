//! Engine tuning knobs sourced from the process environment.

use std::time::Duration;

use crate::error::ConfigResult;
use crate::validate::{parse_duration_secs, parse_positive_usize};

/// Environment variable controlling per-item attachment parallelism.
pub const ENV_ATTACHMENT_CONCURRENCY: &str = "FLOWRELAY_ATTACHMENT_CONCURRENCY";
/// Environment variable controlling per-call connector timeouts.
pub const ENV_CONNECTOR_TIMEOUT: &str = "FLOWRELAY_CONNECTOR_TIMEOUT_SECS";
/// Environment variable controlling run setup timeouts.
pub const ENV_SETUP_TIMEOUT: &str = "FLOWRELAY_SETUP_TIMEOUT_SECS";
/// Environment variable controlling the scheduler poll interval.
pub const ENV_POLL_INTERVAL: &str = "FLOWRELAY_POLL_INTERVAL_SECS";

const DEFAULT_ATTACHMENT_CONCURRENCY: usize = 4;
const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Runtime limits applied by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum number of attachments of one item transferred at once.
    pub attachment_concurrency: usize,
    /// Deadline for each fetch or upload call.
    pub connector_timeout: Duration,
    /// Deadline for connectivity probes, container resolution, and listing.
    pub setup_timeout: Duration,
    /// Interval between scheduler ticks.
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            attachment_concurrency: DEFAULT_ATTACHMENT_CONCURRENCY,
            connector_timeout: DEFAULT_CONNECTOR_TIMEOUT,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl EngineSettings {
    /// Read settings from the process environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(value) = lookup(ENV_ATTACHMENT_CONCURRENCY) {
            settings.attachment_concurrency =
                parse_positive_usize("attachment_concurrency", &value)?;
        }
        if let Some(value) = lookup(ENV_CONNECTOR_TIMEOUT) {
            settings.connector_timeout = parse_duration_secs("connector_timeout", &value)?;
        }
        if let Some(value) = lookup(ENV_SETUP_TIMEOUT) {
            settings.setup_timeout = parse_duration_secs("setup_timeout", &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL) {
            settings.poll_interval = parse_duration_secs("poll_interval", &value)?;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = EngineSettings::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.attachment_concurrency, 4);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = EngineSettings::from_lookup(lookup(&[
            (ENV_ATTACHMENT_CONCURRENCY, "2"),
            (ENV_CONNECTOR_TIMEOUT, "5"),
            (ENV_SETUP_TIMEOUT, "3"),
            (ENV_POLL_INTERVAL, "60"),
        ]))
        .expect("overrides");
        assert_eq!(settings.attachment_concurrency, 2);
        assert_eq!(settings.connector_timeout, Duration::from_secs(5));
        assert_eq!(settings.setup_timeout, Duration::from_secs(3));
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn invalid_values_surface_field() {
        let err = EngineSettings::from_lookup(lookup(&[(ENV_ATTACHMENT_CONCURRENCY, "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "attachment_concurrency",
                ..
            }
        ));
    }
}
