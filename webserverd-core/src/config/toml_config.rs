//! TOML configuration file I/O
//!
//! Handles loading and saving the supervisor configuration to/from TOML
//! files. The configuration lives under a `[daemon]` table so the file can
//! grow other sections without breaking existing ones.

use crate::config::DaemonConfig;
use crate::error::{ConfigError, DaemonError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the default configuration file
pub const CONFIG_ENV_VAR: &str = "WEBSERVERD_CONFIG";

/// Complete TOML configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Supervisor settings
    #[serde(rename = "daemon", default)]
    pub daemon: DaemonConfig,
}

impl TomlConfig {
    /// Create a new TOML configuration
    pub fn new(daemon: DaemonConfig) -> Self {
        Self { daemon }
    }

    /// Load configuration from a TOML file
    ///
    /// Values are not validated here; validation happens when a supervisor
    /// is built from the configuration.
    pub fn from_file(path: &Path) -> Result<Self, DaemonError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DaemonError::Config(ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }),
            _ => DaemonError::Config(ConfigError::IoError {
                message: format!("Failed to read config file: {}", e),
            }),
        })?;

        let config: TomlConfig = toml::from_str(&contents)?;
        debug!("Loaded configuration for uid {} from {:?}", config.daemon.uid, path);

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), DaemonError> {
        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DaemonError::Config(ConfigError::IoError {
                    message: format!("Failed to create config directory: {}", e),
                })
            })?;
        }

        std::fs::write(path, contents).map_err(|_e| {
            DaemonError::Config(ConfigError::SaveFailed {
                path: path.to_string_lossy().to_string(),
            })
        })?;

        info!("Saved daemon configuration to {:?}", path);
        Ok(())
    }
}

/// Get the configuration file path named by the environment, if any
pub fn env_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Load the daemon configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<DaemonConfig, DaemonError> {
    TomlConfig::from_file(path.as_ref()).map(|config| config.daemon)
}

/// Save the daemon configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(config: &DaemonConfig, path: P) -> Result<(), DaemonError> {
    TomlConfig::new(config.clone()).to_file(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("webserverd.toml");

        let original_config = DaemonConfig {
            interface: "localhost".to_string(),
            port: "8123".to_string(),
            uid: "docs".to_string(),
            stop_timeout_ms: 500,
            ..DaemonConfig::new(temp_dir.path())
        };

        save_config_to_path(&original_config, &config_path).unwrap();
        let loaded_config = load_config_from_path(&config_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("webserverd.toml");
        std::fs::write(
            &config_path,
            "[daemon]\nport = 9001\nuid = \"api\"\n\n[daemon.tools]\nlister = \"/bin/ps\"\n",
        )
        .unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.port, "9001");
        assert_eq!(config.uid, "api");
        assert_eq!(config.interface, "127.0.0.1");
        assert_eq!(config.tools.lister, "/bin/ps");
        assert_eq!(config.tools.signaler, "kill");
    }

    #[test]
    fn test_missing_file_is_load_failure() {
        let temp_dir = tempdir().unwrap();
        let result = load_config_from_path(temp_dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(DaemonError::Config(ConfigError::LoadFailed { .. }))
        ));
    }
}
