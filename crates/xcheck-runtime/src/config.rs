//! Runtime configuration.

use std::path::PathBuf;

use crate::{Result, RuntimeError};

/// Environment variable naming the session file written at `end_session`.
pub const ENV_OUTPUT: &str = "XCHECK_OUTPUT";
/// Environment variable overriding the number of ledger shards.
pub const ENV_SHARDS: &str = "XCHECK_SHARDS";
/// Environment variable enabling zstd compression of session files.
pub const ENV_COMPRESS: &str = "XCHECK_COMPRESS";
/// Environment variable overriding the initial per-shard capacity.
pub const ENV_CAPACITY: &str = "XCHECK_CAPACITY";
/// Environment variable naming the fakechecks log file.
pub const ENV_FAKE_OUTPUT: &str = "XCHECK_FAKE_OUTPUT";

/// Default number of events reserved per shard up front.
pub const DEFAULT_SHARD_CAPACITY: usize = 4096;

/// Session ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of independently locked event buffers.
    pub shards: usize,
    /// Events reserved per shard at `begin_session`.
    pub initial_capacity: usize,
    /// Where the C ABI writes the finished session.
    pub output: Option<PathBuf>,
    /// Compress the record stream of written sessions.
    pub compress: bool,
    /// Where fakechecks writes its log (stderr if unset).
    pub fake_output: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shards: num_cpus::get().max(1),
            initial_capacity: DEFAULT_SHARD_CAPACITY,
            output: None,
            compress: false,
            fake_output: None,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `XCHECK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] if a value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_OUTPUT).filter(|p| !p.is_empty()) {
            config.output = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_FAKE_OUTPUT).filter(|p| !p.is_empty()) {
            config.fake_output = Some(PathBuf::from(path));
        }
        if let Some(shards) = lookup(ENV_SHARDS) {
            config.shards = parse_count(ENV_SHARDS, &shards)?;
        }
        if let Some(capacity) = lookup(ENV_CAPACITY) {
            config.initial_capacity = parse_count(ENV_CAPACITY, &capacity)?;
        }
        if let Some(compress) = lookup(ENV_COMPRESS) {
            config.compress = parse_flag(ENV_COMPRESS, &compress)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] if there are no shards.
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(RuntimeError::InvalidConfig(
                "shard count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn with_fake_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.fake_output = Some(path.into());
        self
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| RuntimeError::InvalidConfig(format!("{key}={value:?} is not a count")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(RuntimeError::InvalidConfig(format!(
            "{key}={value:?} is not a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.shards >= 1);
        assert_eq!(config.initial_capacity, DEFAULT_SHARD_CAPACITY);
        assert_eq!(config.output, None);
        assert!(!config.compress);
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (ENV_OUTPUT, "/tmp/run.xck"),
            (ENV_SHARDS, "3"),
            (ENV_CAPACITY, "16"),
            (ENV_COMPRESS, "true"),
        ]))
        .unwrap();
        assert_eq!(config.output, Some(PathBuf::from("/tmp/run.xck")));
        assert_eq!(config.shards, 3);
        assert_eq!(config.initial_capacity, 16);
        assert!(config.compress);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[(ENV_SHARDS, "0")])).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(RuntimeConfig::from_lookup(lookup(&[(ENV_SHARDS, "many")])).is_err());
        assert!(RuntimeConfig::from_lookup(lookup(&[(ENV_COMPRESS, "maybe")])).is_err());
    }
}
