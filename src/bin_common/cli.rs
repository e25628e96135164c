//! Config file lookup for the binaries

use std::path::PathBuf;

/// Which configuration file a binary wants
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// `config/goodfriend.yaml`, overridable through `GOODFRIEND_CONFIG_PATH`
    Client,
    /// Explicit path, never overridden
    Custom(String),
}

impl ConfigType {
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Client => "config/goodfriend.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    pub fn env_var_name(&self) -> &str {
        "GOODFRIEND_CONFIG_PATH"
    }
}

/// Resolve the config path, preferring the environment over the default
///
/// ```
/// use goodfriend::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("demo.yaml".into()));
/// assert_eq!(path.to_str(), Some("demo.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }

    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Command line arguments after the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert_eq!(ConfigType::Client.default_path(), "config/goodfriend.yaml");
        assert_eq!(ConfigType::Custom("alt.yaml".into()).default_path(), "alt.yaml");
    }

    #[test]
    fn test_config_type_env_var() {
        assert_eq!(ConfigType::Client.env_var_name(), "GOODFRIEND_CONFIG_PATH");
    }
}
