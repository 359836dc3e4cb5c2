use std::str::FromStr;
use std::time::Duration;

/// Engine tuning loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on every external lookup (default: 2000 ms).
    pub lookup_timeout: Duration,
    /// Maximum in-flight workload queries for `least_loaded` (default: `8`).
    pub lookup_concurrency: usize,
    /// Retries after a rotation cursor conflict (default: `3`).
    pub commit_retry_limit: u32,
    /// Period of the reassignment sweep (default: 3600 s).
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_millis(2000),
            lookup_concurrency: 8,
            commit_retry_limit: 3,
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `LOOKUP_TIMEOUT_MS`   | `2000`  |
    /// | `LOOKUP_CONCURRENCY`  | `8`     |
    /// | `COMMIT_RETRY_LIMIT`  | `3`     |
    /// | `SWEEP_INTERVAL_SECS` | `3600`  |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let lookup_timeout_ms = parse_or(
            &lookup,
            "LOOKUP_TIMEOUT_MS",
            defaults.lookup_timeout.as_millis() as u64,
        );
        let lookup_concurrency: usize =
            parse_or(&lookup, "LOOKUP_CONCURRENCY", defaults.lookup_concurrency).max(1);
        let commit_retry_limit =
            parse_or(&lookup, "COMMIT_RETRY_LIMIT", defaults.commit_retry_limit);
        let sweep_interval_secs = parse_or(
            &lookup,
            "SWEEP_INTERVAL_SECS",
            defaults.sweep_interval.as_secs(),
        )
        .max(1);

        Self {
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
            lookup_concurrency,
            commit_retry_limit,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
                default
            }
        },
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
    fn defaults_when_unset() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LOOKUP_TIMEOUT_MS", "150"),
            ("LOOKUP_CONCURRENCY", "2"),
            ("COMMIT_RETRY_LIMIT", "0"),
            ("SWEEP_INTERVAL_SECS", "60"),
        ]));
        assert_eq!(config.lookup_timeout, Duration::from_millis(150));
        assert_eq!(config.lookup_concurrency, 2);
        assert_eq!(config.commit_retry_limit, 0);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LOOKUP_TIMEOUT_MS", "soon"),
            ("LOOKUP_CONCURRENCY", "0"),
        ]));
        assert_eq!(config.lookup_timeout, Duration::from_millis(2000));
        assert_eq!(config.lookup_concurrency, 1);
    }
}
