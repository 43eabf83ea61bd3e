//! Engine configuration.
//!
//! All tunables live in an explicit [`EngineConfig`] value that is handed to
//! the decision engine at construction. Configuration can be loaded from a TOML
//! file with `RESILIENCE__<KEY>` environment overrides.

use std::path::Path;

use config::{Config, ConfigError as SourceError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::fallback::FallbackChains;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "RESILIENCE";

/// Retry, backoff and fallback settings for the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts allowed when the caller does not specify a maximum.
    pub default_retries: u32,
    /// Base delay for classifications that do not suggest one, in milliseconds.
    pub default_retry_delay_ms: u64,
    /// When false, the base delay is used as-is for every attempt.
    pub use_exponential_backoff: bool,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Ceiling for any computed delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Symmetric jitter as a fraction of the raw delay (0.1 = ±10%).
    pub jitter_ratio: f64,
    /// Fallback candidates per model identifier.
    pub model_fallbacks: FallbackChains,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_retries: 3,
            default_retry_delay_ms: 15_000,
            use_exponential_backoff: true,
            backoff_multiplier: 2.0,
            max_backoff_ms: 120_000,
            jitter_ratio: 0.1,
            model_fallbacks: FallbackChains::builtin(),
        }
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file path is not valid UTF-8.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// The configuration could not be read or deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] SourceError),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The fallback table is not valid TOML.
    #[error("failed to parse model_fallbacks: {0}")]
    Fallbacks(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl EngineConfig {
    /// Load configuration from a TOML file, applying environment overrides.
    ///
    /// Environment variables use the format `RESILIENCE__<KEY>`, for example
    /// `RESILIENCE__MAX_BACKOFF_MS=60000`. Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed, or holds
    /// values that fail [`EngineConfig::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.restore_fallback_keys(&std::fs::read_to_string(path)?)?;
        engine_config.validate()?;
        engine_config.warn_on_fallback_cycles();

        Ok(engine_config)
    }

    /// Parse configuration from an in-memory TOML document, without
    /// environment overrides.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, config::FileFormat::Toml))
            .build()?;

        let mut engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.restore_fallback_keys(source)?;
        engine_config.validate()?;
        engine_config.warn_on_fallback_cycles();

        Ok(engine_config)
    }

    /// Check that every value is within its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: format!("must be a finite number >= 1, got {}", self.backoff_multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "jitter_ratio",
                reason: format!("must be between 0 and 1, got {}", self.jitter_ratio),
            });
        }
        if self.max_backoff_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_backoff_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        for (model, chain) in self.model_fallbacks.iter() {
            if model.is_empty() || chain.iter().any(String::is_empty) {
                return Err(ConfigError::InvalidValue {
                    field: "model_fallbacks",
                    reason: format!("empty model identifier in chain for {:?}", model),
                });
            }
        }
        Ok(())
    }

    /// The `config` crate lowercases table keys, and model ids are
    /// case-sensitive, so the fallback table is re-read from the TOML source.
    fn restore_fallback_keys(&mut self, source: &str) -> Result<(), ConfigError> {
        let section: FallbackSection = toml::from_str(source)?;
        if let Some(chains) = section.model_fallbacks {
            self.model_fallbacks = chains;
        }
        Ok(())
    }

    fn warn_on_fallback_cycles(&self) {
        for cycle in self.model_fallbacks.cycles() {
            warn!(cycle = %cycle.join(" -> "), "fallback chain loops back on itself");
        }
    }
}

#[derive(Deserialize)]
struct FallbackSection {
    model_fallbacks: Option<FallbackChains>,
}
