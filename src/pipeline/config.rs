//! Pipeline configuration.
//!
//! Settings are layered defaults → environment → CLI overrides, then checked
//! with [`PipelineConfig::validate`]. Nothing in the orchestrator reads the
//! environment directly.

use std::time::Duration;
use thiserror::Error;

use crate::catalog::CallTimeouts;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("Missing {name}: set the {env_var} environment variable")]
    Missing { name: String, env_var: String },

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for batch runs against the puzzle catalog.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Remote service
    /// Catalog base URL, without a trailing slash.
    pub server_url: String,
    /// Pre-shared secret for admin-keyed calls.
    pub admin_key: Option<String>,
    /// Optional key forwarded to the server's generation call.
    pub puzzle_api_key: Option<String>,

    // Batch settings
    /// Number of concepts requested per run.
    pub batch_size: usize,
    /// Courtesy delay between consecutive remote calls. Zero disables it.
    pub delay: Duration,
    /// Model recorded on created jobs.
    pub puzzle_model: String,

    // Timeouts
    pub short_timeout: Duration,
    pub generation_timeout: Duration,
    pub import_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let timeouts = CallTimeouts::default();
        Self {
            server_url: "http://localhost:3000".to_string(),
            admin_key: None,
            puzzle_api_key: None,

            batch_size: 10,
            delay: Duration::from_secs(2),
            puzzle_model: "gemini-2.0-flash-exp".to_string(),

            short_timeout: timeouts.short,
            generation_timeout: timeouts.generation,
            import_timeout: timeouts.import,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PUZZLE_SERVER_URL`: Catalog base URL (default: http://localhost:3000)
    /// - `ADMIN_KEY`: Admin secret (required by admin commands)
    /// - `PUZZLE_API_KEY`: Key forwarded for puzzle generation (optional)
    /// - `PUZZLE_BATCH_SIZE`: Concepts per run (default: 10)
    /// - `PUZZLE_DELAY_SECS`: Delay between calls, fractional seconds (default: 2.0)
    /// - `PUZZLE_MODEL`: Model recorded on jobs (default: gemini-2.0-flash-exp)
    /// - `PUZZLE_SHORT_TIMEOUT_SECS`: Job, tag and listing calls (default: 10)
    /// - `PUZZLE_GENERATION_TIMEOUT_SECS`: Puzzle creation (default: 60)
    /// - `PUZZLE_IMPORT_TIMEOUT_SECS`: Bulk import (default: 300)
    ///
    /// Validation is left to the caller so CLI overrides can be applied first.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = get("PUZZLE_SERVER_URL") {
            config = config.with_server_url(val);
        }
        config.admin_key = get("ADMIN_KEY");
        config.puzzle_api_key = get("PUZZLE_API_KEY");

        if let Some(val) = get("PUZZLE_BATCH_SIZE") {
            config.batch_size = parse_env_value(&val, "PUZZLE_BATCH_SIZE")?;
        }

        if let Some(val) = get("PUZZLE_DELAY_SECS") {
            config.delay = parse_env_secs(&val, "PUZZLE_DELAY_SECS")?;
        }

        if let Some(val) = get("PUZZLE_MODEL") {
            config.puzzle_model = val;
        }

        if let Some(val) = get("PUZZLE_SHORT_TIMEOUT_SECS") {
            config.short_timeout =
                Duration::from_secs(parse_env_value(&val, "PUZZLE_SHORT_TIMEOUT_SECS")?);
        }

        if let Some(val) = get("PUZZLE_GENERATION_TIMEOUT_SECS") {
            config.generation_timeout =
                Duration::from_secs(parse_env_value(&val, "PUZZLE_GENERATION_TIMEOUT_SECS")?);
        }

        if let Some(val) = get("PUZZLE_IMPORT_TIMEOUT_SECS") {
            config.import_timeout =
                Duration::from_secs(parse_env_value(&val, "PUZZLE_IMPORT_TIMEOUT_SECS")?);
        }

        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "server_url cannot be empty".to_string(),
            ));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "server_url must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.puzzle_model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "puzzle_model cannot be empty".to_string(),
            ));
        }

        for (name, timeout) in [
            ("short_timeout", self.short_timeout),
            ("generation_timeout", self.generation_timeout),
            ("import_timeout", self.import_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        Ok(())
    }

    /// Returns the admin key, or a `Missing` error naming `ADMIN_KEY`.
    pub fn require_admin_key(&self) -> Result<&str, ConfigError> {
        self.admin_key.as_deref().ok_or_else(|| ConfigError::Missing {
            name: "admin key".to_string(),
            env_var: "ADMIN_KEY".to_string(),
        })
    }

    /// Per-call timeouts for the catalog client.
    pub fn timeouts(&self) -> CallTimeouts {
        CallTimeouts {
            short: self.short_timeout,
            generation: self.generation_timeout,
            import: self.import_timeout,
        }
    }

    /// Builder method to set the server URL. A trailing `/` is dropped.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder method to set the admin key.
    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    /// Builder method to set the puzzle API key.
    pub fn with_puzzle_api_key(mut self, key: impl Into<String>) -> Self {
        self.puzzle_api_key = Some(key.into());
        self
    }

    /// Builder method to set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder method to set the inter-call delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder method to set the inter-call delay in fractional seconds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for negative or non-finite values.
    pub fn with_delay_secs(self, secs: f64) -> Result<Self, ConfigError> {
        let delay = secs_to_duration(secs, "delay")?;
        Ok(self.with_delay(delay))
    }

    /// Builder method to set the job model.
    pub fn with_puzzle_model(mut self, model: impl Into<String>) -> Self {
        self.puzzle_model = model.into();
        self
    }

    /// Builder method to set all call timeouts at once.
    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.short_timeout = timeouts.short;
        self.generation_timeout = timeouts.generation;
        self.import_timeout = timeouts.import;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as fractional seconds.
fn parse_env_secs(value: &str, key: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_env_value(value, key)?;
    secs_to_duration(secs, key)
}

fn secs_to_duration(secs: f64, key: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a non-negative number of seconds, got {}", secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.delay, Duration::from_secs(2));
        assert_eq!(config.puzzle_model, "gemini-2.0-flash-exp");
        assert_eq!(config.short_timeout, Duration::from_secs(10));
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.import_timeout, Duration::from_secs(300));
        assert!(config.admin_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("PUZZLE_SERVER_URL", "https://catalog.example.com/"),
            ("ADMIN_KEY", "secret"),
            ("PUZZLE_API_KEY", "AIza-test"),
            ("PUZZLE_BATCH_SIZE", "25"),
            ("PUZZLE_DELAY_SECS", "0.5"),
            ("PUZZLE_MODEL", "gemini-exp-1206"),
            ("PUZZLE_IMPORT_TIMEOUT_SECS", "600"),
        ]))
        .expect("valid environment");

        assert_eq!(config.server_url, "https://catalog.example.com");
        assert_eq!(config.admin_key.as_deref(), Some("secret"));
        assert_eq!(config.puzzle_api_key.as_deref(), Some("AIza-test"));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.puzzle_model, "gemini-exp-1206");
        assert_eq!(config.import_timeout, Duration::from_secs(600));
        assert_eq!(config.short_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let config = PipelineConfig::from_lookup(lookup(&[("ADMIN_KEY", "  ")]))
            .expect("valid environment");
        assert!(config.admin_key.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_unparsable_values() {
        let err = PipelineConfig::from_lookup(lookup(&[("PUZZLE_BATCH_SIZE", "ten")]))
            .expect_err("not a number");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PUZZLE_BATCH_SIZE"));

        let err = PipelineConfig::from_lookup(lookup(&[("PUZZLE_DELAY_SECS", "-1")]))
            .expect_err("negative delay");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_server_url("http://127.0.0.1:8080/")
            .with_admin_key("k")
            .with_batch_size(3)
            .with_delay(Duration::ZERO)
            .with_puzzle_model("m");

        assert_eq!(config.server_url, "http://127.0.0.1:8080");
        assert_eq!(config.require_admin_key().expect("set"), "k");
        assert_eq!(config.batch_size, 3);
        assert!(config.delay.is_zero());
        assert_eq!(config.timeouts(), CallTimeouts::default());
    }

    #[test]
    fn test_validation_failures() {
        assert!(PipelineConfig::new().with_batch_size(0).validate().is_err());
        assert!(PipelineConfig::new().with_server_url("localhost:3000").validate().is_err());
        assert!(PipelineConfig::new().with_puzzle_model("").validate().is_err());

        let mut config = PipelineConfig::new();
        config.generation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_admin_key_names_variable() {
        let err = PipelineConfig::new().require_admin_key().expect_err("unset");
        assert!(err.to_string().contains("ADMIN_KEY"));
    }

    #[test]
    fn test_with_delay_secs_rejects_nan() {
        assert!(PipelineConfig::new().with_delay_secs(f64::NAN).is_err());
        let config = PipelineConfig::new().with_delay_secs(1.5).expect("valid");
        assert_eq!(config.delay, Duration::from_millis(1500));
    }
}
