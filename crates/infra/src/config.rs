//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Environment variable selecting [`ConcurrencyMode`].
pub const CONCURRENCY_ENV: &str = "FOLDWORK_CONCURRENCY";
/// Environment variable selecting [`PublishFailurePolicy`].
pub const PUBLISH_FAILURE_ENV: &str = "FOLDWORK_PUBLISH_FAILURE";

/// How appends guard against concurrent writers on the same aggregate.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Append with `ExpectedVersion::Exact(aggregate.version())`; a concurrent
    /// writer turns into an `EventStoreError::Concurrency`.
    #[default]
    Optimistic,
    /// Append with `ExpectedVersion::Any`. Two commands that loaded the same
    /// version can both append (lost update). Only safe with a single writer
    /// per aggregate.
    Unchecked,
}

/// What happens when an event handler fails after its event was stored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Abort the command with `ExecuteError::Publish`. The event stays stored
    /// but is not folded into the in-memory aggregate.
    #[default]
    Halt,
    /// Log the failure, fold the event and keep executing the command.
    Continue,
}

/// Settings of a command dispatcher.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub concurrency: ConcurrencyMode,
    pub publish_failure: PublishFailurePolicy,
}

impl RuntimeConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (e.g. a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(CONCURRENCY_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "optimistic" => config.concurrency = ConcurrencyMode::Optimistic,
                "unchecked" => config.concurrency = ConcurrencyMode::Unchecked,
                other => tracing::warn!(
                    value = other,
                    "{CONCURRENCY_ENV} not recognised; using optimistic"
                ),
            }
        }

        if let Some(raw) = lookup(PUBLISH_FAILURE_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "halt" => config.publish_failure = PublishFailurePolicy::Halt,
                "continue" => config.publish_failure = PublishFailurePolicy::Continue,
                other => tracing::warn!(
                    value = other,
                    "{PUBLISH_FAILURE_ENV} not recognised; using halt"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_optimistic_and_halt() {
        let config = RuntimeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.concurrency, ConcurrencyMode::Optimistic);
        assert_eq!(config.publish_failure, PublishFailurePolicy::Halt);
    }

    #[test]
    fn reads_known_values_case_insensitively() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (CONCURRENCY_ENV, "Unchecked"),
            (PUBLISH_FAILURE_ENV, " continue "),
        ]));
        assert_eq!(config.concurrency, ConcurrencyMode::Unchecked);
        assert_eq!(config.publish_failure, PublishFailurePolicy::Continue);
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[(CONCURRENCY_ENV, "pessimistic")]));
        assert_eq!(config.concurrency, ConcurrencyMode::Optimistic);
    }

    #[test]
    fn deserializes_from_json() {
        let config: RuntimeConfig =
            serde_json::from_value(serde_json::json!({ "publish_failure": "continue" })).unwrap();
        assert_eq!(config.concurrency, ConcurrencyMode::Optimistic);
        assert_eq!(config.publish_failure, PublishFailurePolicy::Continue);
    }
}
