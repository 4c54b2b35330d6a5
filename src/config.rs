//! # Configuration
//!
//! Layered application configuration.
//!
//! Values are resolved in order, later layers overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`config/weather.toml` if present, or an explicit path)
//! 3. environment variables prefixed with `WEATHER`, sections separated by
//!    `__` (e.g. `WEATHER__AGGREGATION__TIMEOUT_MS=2000`)
//!
//! A `.env` file, if present, is loaded into the environment first.
//!
//! # Examples
//!
//! ```no_run
//! use weather_aggregator::config::AppConfig;
//!
//! let config = AppConfig::load(None).unwrap();
//! let engine_config = config.aggregation_config();
//! assert_eq!(engine_config.timeout_ms, config.aggregation.timeout_ms);
//! ```

use crate::application::services::retry::Backoff;
use crate::application::services::weather_aggregation::AggregationConfig;
use crate::infrastructure::sources::simulated::SimulationProfile;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file, loaded when present.
pub const DEFAULT_CONFIG_PATH: &str = "config/weather.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "WEATHER";

/// Separator between prefix, sections and keys in environment variables.
pub const ENV_SEPARATOR: &str = "__";

/// Error raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values were loaded but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Aggregation engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    /// Global timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries per source call.
    pub source_retries: u32,
    /// Linear backoff step in milliseconds.
    pub backoff_step_ms: u64,
    /// Backoff cap in milliseconds.
    pub backoff_max_ms: u64,
    /// Abort source tasks still running at the deadline.
    pub abort_pending_on_timeout: bool,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            source_retries: 0,
            backoff_step_ms: 1000,
            backoff_max_ms: 5000,
            abort_pending_on_timeout: true,
        }
    }
}

/// Simulated source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Lower bound of the latency in milliseconds.
    pub min_latency_ms: u64,
    /// Exclusive upper bound of the latency in milliseconds.
    pub max_latency_ms: u64,
    /// Probability that a call fails.
    pub failure_probability: f64,
    /// Seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            min_latency_ms: 1000,
            max_latency_ms: 3000,
            failure_probability: 0.5,
            seed: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "weather_aggregator=info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Aggregation engine settings.
    pub aggregation: AggregationSettings,
    /// Simulated source settings.
    pub simulation: SimulationSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from `.env`, the TOML file and the environment.
    ///
    /// Without `path` the default file is used when it exists. An explicit
    /// path must exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional TOML file, overriding the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read and
    /// `ConfigError::Invalid` if the values fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load_with_env(path, None)
    }

    /// Loads configuration, reading environment variables from `env`
    /// instead of the process environment when given.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional TOML file, overriding the default location
    /// * `env` - `WEATHER__*` variables to use in place of the process environment
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        Self::assemble(config::Config::builder().add_source(file), env)
    }

    /// Parses configuration from TOML text, then applies `env` overrides.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn from_toml_str(
        content: &str,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = File::from_str(content, FileFormat::Toml);
        Self::assemble(config::Config::builder().add_source(file), env)
    }

    fn assemble(
        builder: ConfigBuilder<DefaultState>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env);

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the loaded values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let aggregation = &self.aggregation;
        if aggregation.timeout_ms == 0 {
            return Err(ConfigError::invalid("aggregation.timeout_ms must be positive"));
        }
        if aggregation.backoff_max_ms < aggregation.backoff_step_ms {
            return Err(ConfigError::invalid(format!(
                "aggregation.backoff_max_ms ({}) is below backoff_step_ms ({})",
                aggregation.backoff_max_ms, aggregation.backoff_step_ms
            )));
        }

        let simulation = &self.simulation;
        if simulation.min_latency_ms > simulation.max_latency_ms {
            return Err(ConfigError::invalid(format!(
                "simulation.min_latency_ms ({}) exceeds max_latency_ms ({})",
                simulation.min_latency_ms, simulation.max_latency_ms
            )));
        }
        if !(0.0..=1.0).contains(&simulation.failure_probability) {
            return Err(ConfigError::invalid(format!(
                "simulation.failure_probability must be within [0, 1], got {}",
                simulation.failure_probability
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter must not be empty"));
        }
        Ok(())
    }

    /// Builds the engine configuration.
    #[must_use]
    pub fn aggregation_config(&self) -> AggregationConfig {
        let settings = &self.aggregation;
        AggregationConfig::with_timeout(settings.timeout_ms)
            .with_source_retries(settings.source_retries)
            .with_backoff(Backoff::Linear {
                step: Duration::from_millis(settings.backoff_step_ms),
                max: Duration::from_millis(settings.backoff_max_ms),
            })
            .with_abort_pending_on_timeout(settings.abort_pending_on_timeout)
    }

    /// Builds the profile of the simulated sources.
    #[must_use]
    pub fn simulation_profile(&self) -> SimulationProfile {
        let settings = &self.simulation;
        SimulationProfile::new(
            Duration::from_millis(settings.min_latency_ms),
            Duration::from_millis(settings.max_latency_ms),
            settings.failure_probability,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = AppConfig::from_toml_str("", env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());

        let engine = config.aggregation_config();
        assert_eq!(engine, AggregationConfig::default());
        assert_eq!(config.simulation_profile(), SimulationProfile::default());
        assert_eq!(config.logging.filter, "weather_aggregator=info");
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            [aggregation]
            timeout_ms = 2500
            source_retries = 2

            [simulation]
            failure_probability = 0.0
            seed = 42

            [logging]
            json = true
        "#;

        let config = AppConfig::from_toml_str(toml, env(&[])).unwrap();

        assert_eq!(config.aggregation.timeout_ms, 2500);
        assert_eq!(config.aggregation.source_retries, 2);
        assert_eq!(config.aggregation.backoff_step_ms, 1000);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.failure_probability, 0.0);
        assert!(config.logging.json);
    }

    #[test]
    fn environment_overrides_file() {
        let toml = "[aggregation]\ntimeout_ms = 2500\n";
        let config = AppConfig::from_toml_str(
            toml,
            env(&[
                ("WEATHER__AGGREGATION__TIMEOUT_MS", "1200"),
                ("WEATHER__AGGREGATION__ABORT_PENDING_ON_TIMEOUT", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.aggregation.timeout_ms, 1200);
        assert!(!config.aggregation.abort_pending_on_timeout);
        assert!(!config.aggregation_config().abort_pending_on_timeout);
    }

    #[test]
    fn rejects_inverted_latency_bounds() {
        let toml = "[simulation]\nmin_latency_ms = 500\nmax_latency_ms = 100\n";
        let err = AppConfig::from_toml_str(toml, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("min_latency_ms"));
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let toml = "[simulation]\nfailure_probability = 1.5\n";
        let err = AppConfig::from_toml_str(toml, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.aggregation.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_load_error() {
        let err = AppConfig::from_toml_str("[aggregation\ntimeout_ms =", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn missing_explicit_file_is_load_error() {
        let err = AppConfig::load_with_env(Some(Path::new("does/not/exist.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn backoff_is_linear() {
        let config = AppConfig::default();
        let policy = config.aggregation_config().retry_policy();
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(9), Duration::from_secs(5));
    }
}
