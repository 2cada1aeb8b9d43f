//! Watcher configuration

use crate::error::{Result, SdkError};
use resultwatch_core::application::constants::{DEFAULT_BUCKET_SIZE, DEFAULT_PARALLELISM};
use resultwatch_core::application::WatchOptions;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Tuning knobs for a [`ResultWatcher`](crate::ResultWatcher)
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Maximum number of results per subscription
    pub bucket_size: usize,
    /// Maximum number of subscriptions open at once
    pub parallelism: usize,
    /// Overall deadline per watch, in milliseconds
    pub deadline_ms: Option<u64>,
    /// Consecutive lost subscriptions tolerated per chunk (unbounded if unset)
    pub max_resubscriptions: Option<u32>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            deadline_ms: None,
            max_resubscriptions: None,
        }
    }
}

impl WatchConfig {
    /// Load from `RESULTWATCH_*` environment variables
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    /// - SdkError::Config if a variable is malformed or a value is zero
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        debug!(
            bucket_size = config.bucket_size,
            parallelism = config.parallelism,
            deadline_ms = ?config.deadline_ms,
            max_resubscriptions = ?config.max_resubscriptions,
            "Watch config loaded from environment"
        );
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            bucket_size: parse_var(&lookup, "RESULTWATCH_BUCKET_SIZE")?
                .unwrap_or(defaults.bucket_size),
            parallelism: parse_var(&lookup, "RESULTWATCH_PARALLELISM")?
                .unwrap_or(defaults.parallelism),
            deadline_ms: parse_var(&lookup, "RESULTWATCH_DEADLINE_MS")?,
            max_resubscriptions: parse_var(&lookup, "RESULTWATCH_MAX_RESUBSCRIPTIONS")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_size == 0 {
            return Err(SdkError::Config("bucket_size must be positive".to_string()));
        }
        if self.parallelism == 0 {
            return Err(SdkError::Config("parallelism must be positive".to_string()));
        }
        if self.deadline_ms == Some(0) {
            return Err(SdkError::Config("deadline_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_resubscriptions(mut self, max: u32) -> Self {
        self.max_resubscriptions = Some(max);
        self
    }

    pub(crate) fn to_options(&self) -> WatchOptions {
        WatchOptions {
            bucket_size: self.bucket_size,
            parallelism: self.parallelism,
            deadline: self.deadline_ms.map(Duration::from_millis),
            max_resubscriptions: self.max_resubscriptions,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| SdkError::Config(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = WatchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WatchConfig::default());
        assert_eq!(config.bucket_size, 100);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_env_overrides() {
        let config = WatchConfig::from_lookup(lookup(&[
            ("RESULTWATCH_BUCKET_SIZE", "25"),
            ("RESULTWATCH_PARALLELISM", " 4 "),
            ("RESULTWATCH_DEADLINE_MS", "1500"),
            ("RESULTWATCH_MAX_RESUBSCRIPTIONS", "3"),
        ]))
        .unwrap();

        let options = config.to_options();
        assert_eq!(options.bucket_size, 25);
        assert_eq!(options.parallelism, 4);
        assert_eq!(options.deadline, Some(Duration::from_millis(1500)));
        assert_eq!(options.max_resubscriptions, Some(3));
    }

    #[test]
    fn test_malformed_or_zero_values_rejected() {
        let err = WatchConfig::from_lookup(lookup(&[("RESULTWATCH_PARALLELISM", "many")]))
            .unwrap_err();
        assert!(
            matches!(err, SdkError::Config(ref msg) if msg.contains("RESULTWATCH_PARALLELISM"))
        );

        let err = WatchConfig::from_lookup(lookup(&[("RESULTWATCH_BUCKET_SIZE", "0")]))
            .unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn test_deserialize_partial() {
        let raw = r#"{"parallelism": 8, "deadline_ms": 30000}"#;
        let config: WatchConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.bucket_size, DEFAULT_BUCKET_SIZE);
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.deadline_ms, Some(30_000));
        assert_eq!(config.max_resubscriptions, None);
    }
}
