//! Hub configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JSONBIN_BIN_ID` - Document id of the shared snapshot on JSONBin
//! - `JSONBIN_API_KEY` - JSONBin master key (sent as `X-Master-Key`)
//!
//! ## Optional
//! - `JSONBIN_BASE_URL` - Document API base (default: `https://api.jsonbin.io/v3/b`)
//! - `HUB_DATA_DIR` - Directory used as local key-value storage (default: `./data`)
//! - `HUB_HOST` - Bind address (default: 127.0.0.1)
//! - `HUB_PORT` - Listen port (default: 3000)
//! - `HUB_SAVE_DELAY_MS` - Debounce delay before a remote save (default: 2000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_BASE_URL: &str = "https://api.jsonbin.io/v3/b";
const DEFAULT_SAVE_DELAY_MS: u64 = 2000;
const DEFAULT_DATA_DIR: &str = "./data";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Hub application configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the local key-value files
    pub data_dir: PathBuf,
    /// Remote document store configuration
    pub remote: RemoteConfig,
    /// Delay between the last mutation of a burst and the remote save
    pub save_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// JSONBin document store configuration.
///
/// Implements `Debug` manually to redact the master key.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Document API base, e.g. `https://api.jsonbin.io/v3/b`
    pub base_url: Url,
    /// Fixed document id holding the snapshot
    pub bin_id: String,
    /// Static credential sent with every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("bin_id", &self.bin_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RemoteConfig {
    /// Build a validated remote configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL does not parse as http(s) or the
    /// bin id contains anything other than ASCII letters, digits, `-` or `_`.
    pub fn new(base_url: &str, bin_id: &str, api_key: SecretString) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidEnvVar("JSONBIN_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "JSONBIN_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        if bin_id.is_empty()
            || !bin_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidEnvVar(
                "JSONBIN_BIN_ID".to_string(),
                "must be a non-empty document id".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            bin_id: bin_id.to_string(),
            api_key,
        })
    }

    /// Load the remote configuration from environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, invalid, or
    /// the master key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("JSONBIN_BASE_URL", DEFAULT_BASE_URL);
        let bin_id = get_required_env("JSONBIN_BIN_ID")?;
        let api_key = get_validated_secret("JSONBIN_API_KEY")?;
        Self::new(&base_url, &bin_id, api_key)
    }

    /// URL of the latest document version (read).
    #[must_use]
    pub fn latest_url(&self) -> String {
        format!("{}/{}/latest", self.base_url.as_str().trim_end_matches('/'), self.bin_id)
    }

    /// URL of the document (full overwrite).
    #[must_use]
    pub fn document_url(&self) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), self.bin_id)
    }
}

impl HubConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the master key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote = RemoteConfig::from_env()?;

        let host = get_env_or_default("HUB_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HUB_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("HUB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("HUB_PORT".to_string(), e.to_string()))?;
        let data_dir = data_dir_from_env();
        let save_delay = save_delay_from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            data_dir,
            remote,
            save_delay,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the remote store configuration.
    #[must_use]
    pub const fn remote(&self) -> &RemoteConfig {
        &self.remote
    }
}

/// Read `HUB_DATA_DIR`, falling back to `./data`.
#[must_use]
pub fn data_dir_from_env() -> PathBuf {
    PathBuf::from(get_env_or_default("HUB_DATA_DIR", DEFAULT_DATA_DIR))
}

/// Read `HUB_SAVE_DELAY_MS`, falling back to the default delay.
///
/// # Errors
///
/// Returns `ConfigError` if the value is not a whole number of milliseconds.
pub fn save_delay_from_env() -> Result<Duration, ConfigError> {
    get_optional_env("HUB_SAVE_DELAY_MS").map_or(
        Ok(default_save_delay()),
        |raw| {
            raw.parse::<u64>().map(Duration::from_millis).map_err(|e| {
                ConfigError::InvalidEnvVar("HUB_SAVE_DELAY_MS".to_string(), e.to_string())
            })
        },
    )
}

/// Default debounce delay for remote saves.
#[must_use]
pub const fn default_save_delay() -> Duration {
    Duration::from_millis(DEFAULT_SAVE_DELAY_MS)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real master keys are long random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the master key from the JSONBin dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
