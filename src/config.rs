//! Configuration management for Confidant
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ConfidantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Confidant
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Anonymous identity storage settings
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Liveness polling settings
    #[serde(default)]
    pub health: HealthConfig,
    /// Chat view settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; endpoint paths such as `/api/chat` are
    /// appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds) applied by the HTTP client
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bearer token for catalog writes (create, update, delete)
    #[serde(default)]
    pub admin_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            admin_token: None,
        }
    }
}

/// Where the anonymous session token is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    /// Embedded sled database in the user data directory
    Sled,
    /// Operating system credential store
    Keyring,
    /// Process memory only; a new identity every run
    Memory,
}

impl std::str::FromStr for IdentityBackend {
    type Err = ConfidantError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sled" => Ok(Self::Sled),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(ConfidantError::Config(format!(
                "Invalid identity backend: {}. Must be one of: sled, keyring, memory",
                other
            ))),
        }
    }
}

/// Identity storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Storage backend
    #[serde(default = "default_identity_backend")]
    pub backend: IdentityBackend,

    /// Directory of the sled database; defaults to `<data dir>/identity`
    #[serde(default)]
    pub path: Option<String>,

    /// Key under which the token is stored
    #[serde(default = "default_identity_key")]
    pub key: String,
}

fn default_identity_backend() -> IdentityBackend {
    IdentityBackend::Sled
}

fn default_identity_key() -> String {
    "session_id".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            backend: default_identity_backend(),
            path: None,
            key: default_identity_key(),
        }
    }
}

/// Liveness polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between probes
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Path probed for liveness, relative to the base URL
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
}

fn default_interval() -> u64 {
    30
}

fn default_probe_path() -> String {
    "/api/".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            probe_path: default_probe_path(),
        }
    }
}

/// Chat view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Show a greeting from the companion when the thread is empty
    #[serde(default = "default_show_greeting")]
    pub show_greeting: bool,

    /// Text of the `system-error` notice appended after a failed send
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

fn default_show_greeting() -> bool {
    true
}

/// Apology appended to a thread when a send fails
pub const DEFAULT_SEND_ERROR_MESSAGE: &str =
    "Sorry, I'm having trouble responding right now. Please try again.";

fn default_error_message() -> String {
    DEFAULT_SEND_ERROR_MESSAGE.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            show_greeting: default_show_greeting(),
            error_message: default_error_message(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfidantError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ConfidantError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("CONFIDANT_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("CONFIDANT_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(value) => self.api.timeout_seconds = value,
                Err(_) => tracing::warn!("Ignoring invalid CONFIDANT_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(token) = std::env::var("CONFIDANT_ADMIN_TOKEN") {
            self.api.admin_token = Some(token);
        }

        if let Ok(backend) = std::env::var("CONFIDANT_IDENTITY_BACKEND") {
            match backend.parse() {
                Ok(value) => self.identity.backend = value,
                Err(e) => tracing::warn!("Ignoring CONFIDANT_IDENTITY_BACKEND: {}", e),
            }
        }

        if let Ok(path) = std::env::var("CONFIDANT_IDENTITY_PATH") {
            self.identity.path = Some(path);
        }

        if let Ok(interval) = std::env::var("CONFIDANT_HEALTH_INTERVAL") {
            match interval.parse() {
                Ok(value) => self.health.interval_seconds = value,
                Err(_) => tracing::warn!("Ignoring invalid CONFIDANT_HEALTH_INTERVAL: {}", interval),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            tracing::debug!("Using API URL override from CLI: {}", api_url);
            self.api.base_url = api_url.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::Config`] if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfidantError::Config("api.base_url cannot be empty".to_string()).into());
        }

        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfidantError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfidantError::Config(format!(
                "api.base_url must be a hierarchical URL: {}",
                self.api.base_url
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfidantError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.health.interval_seconds == 0 {
            return Err(ConfidantError::Config(
                "health.interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !self.health.probe_path.starts_with('/') {
            return Err(ConfidantError::Config(
                "health.probe_path must start with '/'".to_string(),
            )
            .into());
        }

        if self.identity.key.trim().is_empty() {
            return Err(
                ConfidantError::Config("identity.key cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
