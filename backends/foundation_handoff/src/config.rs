use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{ConfigError, ConfigResult};

/// Environment variable overriding [`HandoffConfig::pacing_ms`].
pub const PACING_ENV: &str = "HANDOFF_PACING_MS";

/// Environment variable overriding [`HandoffConfig::stack_size`].
pub const STACK_SIZE_ENV: &str = "HANDOFF_STACK_SIZE";

const DEFAULT_PACING_MS: u64 = 100;
const NANOS_PER_MILLI: u128 = 1_000_000;
const DEFAULT_PRODUCER_NAME: &str = "handoff-producer";
const DEFAULT_CONSUMER_NAME: &str = "handoff-consumer";

/// `HandoffConfig` carries the knobs of a producer/consumer pipeline:
/// how long the producer waits between values and how its threads
/// get named and sized.
///
/// Loaded from a TOML file, from the environment, or built in code:
///
/// ```toml
/// pacing_ms = 1
/// producer_name = "SrcWorker"
/// consumer_name = "SinkWorker"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    pub pacing_ms: u64,
    pub producer_name: String,
    pub consumer_name: String,
    pub stack_size: Option<usize>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            pacing_ms: DEFAULT_PACING_MS,
            producer_name: String::from(DEFAULT_PRODUCER_NAME),
            consumer_name: String::from(DEFAULT_CONSUMER_NAME),
            stack_size: None,
        }
    }
}

impl HandoffConfig {
    /// `from_path` reads the TOML file at `target`, keys missing from
    /// the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IOError`] when the file can't be read and
    /// [`ConfigError::DeserializationFailed`] when it is not valid.
    pub fn from_path<V: Into<std::path::PathBuf>>(target: V) -> ConfigResult<Self> {
        let target_path = target.into();
        let config_content = std::fs::read_to_string(target_path)?;
        Self::from_toml(&config_content)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationFailed`] when `content` is not valid.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config_obj: Self = toml::from_str(content)?;
        Ok(config_obj)
    }

    /// `from_env` returns the default configuration with the
    /// `HANDOFF_*` environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when an override is not a number.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_env_overrides()
    }

    /// `with_env_overrides` applies the `HANDOFF_*` environment
    /// variables on top of the current values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when an override is not a number.
    pub fn with_env_overrides(mut self) -> ConfigResult<Self> {
        if let Some(pacing_ms) = read_env::<u64>(PACING_ENV)? {
            tracing::debug!("Retrieved pacing_ms from {}", PACING_ENV);
            self.pacing_ms = pacing_ms;
        }

        if let Some(stack_size) = read_env::<usize>(STACK_SIZE_ENV)? {
            tracing::debug!("Retrieved stack_size from {}", STACK_SIZE_ENV);
            self.stack_size = Some(stack_size);
        }

        Ok(self)
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Sets the producer pacing, rounded up to whole milliseconds so a
    /// non-zero pacing never turns into a producer that does not sleep.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        let millis = pacing.as_nanos().div_ceil(NANOS_PER_MILLI);
        self.pacing_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_producer_name(mut self, name: impl Into<String>) -> Self {
        self.producer_name = name.into();
        self
    }

    #[must_use]
    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

fn read_env<T: FromStr>(key: &'static str) -> ConfigResult<Option<T>> {
    match env::var(key) {
        Ok(value) => match T::from_str(value.trim()) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidValue { key, value }),
        },
        Err(_) => Ok(None),
    }
}
