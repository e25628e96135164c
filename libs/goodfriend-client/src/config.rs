use crate::hashing::{self, IdentityHasher, DEFAULT_BUILD_ID};
use hyperstream::StreamClientSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Overrides `group_key` from the YAML
pub const GROUP_KEY_ENV: &str = "GOODFRIEND_GROUP_KEY";

/// Overrides `client_key` from the YAML
pub const CLIENT_KEY_ENV: &str = "GOODFRIEND_CLIENT_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid group key: {0}")]
    HashError(#[from] hashing::HashError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// GoodFriend client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,

    /// Private group key; empty means the public group
    #[serde(default)]
    pub group_key: String,

    /// Optional key sent in the `Authorization` header
    #[serde(default)]
    pub client_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub stream: StreamConfig,

    /// Content ids whose login updates should be reported
    #[serde(default)]
    pub watched_content_ids: Vec<u64>,

    /// Overrides the build identifier mixed into identity hashes
    #[serde(default)]
    pub build_id: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Stream reconnection settings, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub reconnect_delay_min_ms: u64,
    pub reconnect_delay_max_ms: u64,
    pub reconnect_delay_increment_ms: u64,
    pub heartbeat_timeout_ms: Option<u64>,
    pub max_reconnect_attempts: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_min_ms: 5_000,
            reconnect_delay_max_ms: 60_000,
            reconnect_delay_increment_ms: 5_000,
            heartbeat_timeout_ms: Some(75_000),
            max_reconnect_attempts: None,
        }
    }
}

impl StreamConfig {
    pub fn to_settings(&self) -> StreamClientSettings {
        StreamClientSettings {
            reconnect_delay_min: Duration::from_millis(self.reconnect_delay_min_ms),
            reconnect_delay_max: Duration::from_millis(self.reconnect_delay_max_ms),
            reconnect_delay_increment: Duration::from_millis(self.reconnect_delay_increment_ms),
            heartbeat_timeout: self.heartbeat_timeout_ms.map(Duration::from_millis),
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

impl ClientConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();

        Self::from_yaml_with_env(&yaml_content, |name| std::env::var(name).ok())
    }

    /// Parse YAML, then apply overrides from `env`
    pub fn from_yaml_with_env(
        yaml_content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config: ClientConfig = serde_yaml::from_str(yaml_content)?;

        if let Some(group_key) = env(GROUP_KEY_ENV) {
            config.group_key = group_key;
        }
        if let Some(client_key) = env(CLIENT_KEY_ENV).filter(|key| !key.is_empty()) {
            config.client_key = Some(client_key);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api_base_url must be an http or https URL, got '{}'",
                self.api_base_url
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let stream = &self.stream;
        if stream.reconnect_delay_min_ms == 0 || stream.reconnect_delay_increment_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect delays must be greater than 0".to_string(),
            ));
        }

        self.stream
            .to_settings()
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_settings(&self) -> StreamClientSettings {
        self.stream.to_settings()
    }

    /// Hasher keyed by this configuration's group key
    pub fn identity_hasher(&self) -> Result<IdentityHasher> {
        let build_id = self.build_id.as_deref().unwrap_or(DEFAULT_BUILD_ID);
        Ok(IdentityHasher::new(self.group_key.as_bytes(), build_id)?)
    }
}
