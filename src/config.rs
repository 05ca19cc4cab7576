//! Run configuration for the order tagging pipeline.
//!
//! Credentials and the API version come from environment variables; the
//! remaining knobs (worker pool size, page size, backoff parameters, the
//! test-mode order limit) have defaults that the CLI can override.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Maximum page size the Admin GraphQL API accepts for a connection.
pub const REMOTE_MAX_PAGE_SIZE: usize = 250;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Retry/backoff parameters applied to every remote call.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Factor applied to the delay on each consecutive retry.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Maximum number of calls per operation, including the first.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

/// Configuration for a tagging run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    // Store settings
    /// Shop domain, e.g. "example.myshopify.com".
    pub store_domain: String,
    /// Admin API access token.
    pub access_token: String,
    /// Admin API version segment of the endpoint URL.
    pub api_version: String,

    // Pipeline settings
    /// Number of concurrent tagging workers.
    pub workers: usize,
    /// Orders requested per pagination call.
    pub page_size: usize,
    /// Stop enumeration after this many orders (test mode).
    pub test_limit: Option<usize>,

    // Client settings
    /// Retry/backoff policy parameters.
    pub backoff: BackoffConfig,
    /// HTTP request timeout.
    pub request_timeout: Duration,

    // Output settings
    /// Directory the run summary artifact is written to.
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            // Store defaults (placeholders; from_env fills the real values)
            store_domain: String::new(),
            access_token: String::new(),
            api_version: "2024-01".to_string(),

            // Pipeline defaults
            workers: 5,
            page_size: 50,
            test_limit: None,

            // Client defaults
            backoff: BackoffConfig::default(),
            request_timeout: Duration::from_secs(30),

            // Output defaults
            output_dir: PathBuf::from("./runs"),
        }
    }
}

impl RunConfig {
    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHOPIFY_STORE_DOMAIN`: shop domain (required)
    /// - `SHOPIFY_ACCESS_TOKEN`: Admin API token (required)
    /// - `SHOPIFY_API_VERSION`: API version (default: 2024-01)
    /// - `TAGFORGE_WORKERS`: concurrent tagging workers (default: 5)
    /// - `TAGFORGE_PAGE_SIZE`: orders per page (default: 50)
    /// - `TAGFORGE_BACKOFF_BASE_MS`: first retry delay in ms (default: 1000)
    /// - `TAGFORGE_BACKOFF_MULTIPLIER`: delay growth factor (default: 2.0)
    /// - `TAGFORGE_BACKOFF_MAX_MS`: delay cap in ms (default: 30000)
    /// - `TAGFORGE_MAX_ATTEMPTS`: calls per operation (default: 5)
    /// - `TAGFORGE_OUTPUT_DIR`: summary artifact directory (default: ./runs)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or have
    /// invalid values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.store_domain = std::env::var("SHOPIFY_STORE_DOMAIN")
            .map_err(|_| ConfigError::MissingEnvVar("SHOPIFY_STORE_DOMAIN".to_string()))?;

        config.access_token = std::env::var("SHOPIFY_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("SHOPIFY_ACCESS_TOKEN".to_string()))?;

        if let Ok(val) = std::env::var("SHOPIFY_API_VERSION") {
            config.api_version = val;
        }

        if let Ok(val) = std::env::var("TAGFORGE_WORKERS") {
            config.workers = parse_env_value(&val, "TAGFORGE_WORKERS")?;
        }

        if let Ok(val) = std::env::var("TAGFORGE_PAGE_SIZE") {
            config.page_size = parse_env_value(&val, "TAGFORGE_PAGE_SIZE")?;
        }

        if let Ok(val) = std::env::var("TAGFORGE_BACKOFF_BASE_MS") {
            let ms: u64 = parse_env_value(&val, "TAGFORGE_BACKOFF_BASE_MS")?;
            config.backoff.base_delay = Duration::from_millis(ms);
        }

        if let Ok(val) = std::env::var("TAGFORGE_BACKOFF_MULTIPLIER") {
            config.backoff.multiplier = parse_env_value(&val, "TAGFORGE_BACKOFF_MULTIPLIER")?;
        }

        if let Ok(val) = std::env::var("TAGFORGE_BACKOFF_MAX_MS") {
            let ms: u64 = parse_env_value(&val, "TAGFORGE_BACKOFF_MAX_MS")?;
            config.backoff.max_delay = Duration::from_millis(ms);
        }

        if let Ok(val) = std::env::var("TAGFORGE_MAX_ATTEMPTS") {
            config.backoff.max_attempts = parse_env_value(&val, "TAGFORGE_MAX_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("TAGFORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the number of tagging workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the pagination page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the test-mode order limit.
    pub fn with_test_limit(mut self, limit: Option<usize>) -> Self {
        self.test_limit = limit;
        self
    }

    /// Sets the summary artifact directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// The GraphQL endpoint this configuration points at.
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store_domain, self.api_version
        )
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_domain.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store_domain cannot be empty".to_string(),
            ));
        }

        if self.access_token.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "access_token cannot be empty".to_string(),
            ));
        }

        if self.api_version.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_version cannot be empty".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "workers must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > REMOTE_MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationFailed(format!(
                "page_size must be between 1 and {}",
                REMOTE_MAX_PAGE_SIZE
            )));
        }

        if let Some(limit) = self.test_limit {
            if limit == 0 {
                return Err(ConfigError::ValidationFailed(
                    "test_limit must be greater than 0 when set".to_string(),
                ));
            }
        }

        if self.backoff.multiplier < 1.0 {
            return Err(ConfigError::ValidationFailed(
                "backoff multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.backoff.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.backoff.max_delay < self.backoff.base_delay {
            return Err(ConfigError::ValidationFailed(
                "backoff max_delay must be at least base_delay".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses an environment variable value into the target type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
