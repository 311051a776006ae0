//! Configuration module
//!
//! Holds the supervisor configuration, validates it, and derives the
//! per-uid PID and log file paths plus the resolved launch commandline.

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub mod template;
pub mod toml_config;

/// Default uid used when the caller does not choose one
pub const DEFAULT_UID: &str = "webserver";

/// Default command template: PHP's built-in server, backgrounded, echoing its PID
pub const DEFAULT_COMMAND_TEMPLATE: &str = "{} -S {}:{} -t {} >> {} 2>&1 & echo $!";

/// Suffix for the log file
pub const LOG_FILE_SUFFIX: &str = ".log";

/// Suffix for the PID file
pub const PID_FILE_SUFFIX: &str = ".pid";

/// Names of the external tools the supervisor drives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Process lister, invoked as `<lister> -p <pid>`
    pub lister: String,

    /// Signal sender, invoked as `<signaler> <pid>`
    pub signaler: String,

    /// Shell used to run the launch commandline, invoked as `<shell> -c <commandline>`
    pub shell: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            lister: "ps".to_string(),
            signaler: "kill".to_string(),
            shell: "sh".to_string(),
        }
    }
}

/// Supervisor configuration as supplied by the caller
///
/// Nothing here is trusted until [`DaemonConfig::validate`] has accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Interface to listen on (hostname or IP literal)
    pub interface: String,

    /// Port to listen on; kept as text so a non-numeric value can be reported
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: String,

    /// Document root to serve from
    pub document_root: PathBuf,

    /// Unique identifier namespacing this instance's PID and log files
    pub uid: String,

    /// Executable to launch
    pub executable: String,

    /// Directory holding the PID and log files; also the working directory
    pub temp_dir: PathBuf,

    /// Command template with five positional slots, see [`template`]
    pub command_template: String,

    /// External tools
    pub tools: ToolsConfig,

    /// How long `stop` waits for the process to vanish (0 = do not wait)
    pub stop_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_string(),
            port: "8000".to_string(),
            document_root: PathBuf::from("."),
            uid: DEFAULT_UID.to_string(),
            executable: "php".to_string(),
            temp_dir: std::env::temp_dir(),
            command_template: DEFAULT_COMMAND_TEMPLATE.to_string(),
            tools: ToolsConfig::default(),
            stop_timeout_ms: 0,
        }
    }
}

impl DaemonConfig {
    /// Create a configuration for the given document root, defaults elsewhere
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration and derive file paths and commandline
    ///
    /// Checks run in a fixed order and the first failure is returned.
    /// Validation never touches the filesystem beyond metadata lookups.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if !is_valid_interface(&self.interface) {
            return Err(ConfigError::InvalidInterface {
                value: self.interface.clone(),
            });
        }

        let port: u16 = self
            .port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort {
                value: self.port.clone(),
            })?;

        if !self.document_root.is_dir() {
            return Err(ConfigError::InvalidDocumentRoot {
                path: self.document_root.to_string_lossy().to_string(),
            });
        }

        if self.uid.is_empty()
            || self.uid.contains(|c: char| c == '/' || c == '\\')
            || self.uid == "."
            || self.uid == ".."
        {
            return Err(ConfigError::InvalidUid {
                value: self.uid.clone(),
            });
        }

        if !is_valid_executable(&self.executable) {
            return Err(ConfigError::InvalidExecutable {
                path: self.executable.clone(),
            });
        }

        if !self.temp_dir.is_dir() {
            return Err(ConfigError::InvalidTempDir {
                path: self.temp_dir.to_string_lossy().to_string(),
            });
        }

        let log_file = self.temp_dir.join(format!("{}{}", self.uid, LOG_FILE_SUFFIX));
        let pid_file = self.temp_dir.join(format!("{}{}", self.uid, PID_FILE_SUFFIX));

        let port_text = port.to_string();
        let document_root = self.document_root.to_string_lossy();
        let log_file_text = log_file.to_string_lossy();
        let commandline = template::render(
            &self.command_template,
            &[
                self.executable.as_str(),
                self.interface.as_str(),
                port_text.as_str(),
                &*document_root,
                &*log_file_text,
            ],
        )?;

        Ok(ValidatedConfig {
            interface: self.interface.clone(),
            port,
            uid: self.uid.clone(),
            temp_dir: self.temp_dir.clone(),
            log_file,
            pid_file,
            commandline,
            tools: self.tools.clone(),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        })
    }
}

/// Configuration that passed validation, with derived values
///
/// Immutable once built; two validated configurations with the same uid
/// and temp directory address the same PID and log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    interface: String,
    port: u16,
    uid: String,
    temp_dir: PathBuf,
    log_file: PathBuf,
    pid_file: PathBuf,
    commandline: String,
    tools: ToolsConfig,
    stop_timeout: Duration,
}

impl ValidatedConfig {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Fully resolved launch commandline
    pub fn commandline(&self) -> &str {
        &self.commandline
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }
}

fn hostname_regex() -> &'static Regex {
    static HOSTNAME: OnceLock<Regex> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        Regex::new(r"^(?i)[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*\.?$")
            .expect("hostname pattern is valid")
    })
}

/// Check whether `value` is an IPv4/IPv6 literal or an RFC 1123 hostname
pub fn is_valid_interface(value: &str) -> bool {
    if value.parse::<IpAddr>().is_ok() {
        return true;
    }

    // Bracketed IPv6 literal as written in URLs
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return inner.parse::<std::net::Ipv6Addr>().is_ok();
    }

    // Dotted digits that failed to parse as IPv4 are not a hostname either
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }

    value.len() <= 253 && hostname_regex().is_match(value)
}

/// An executable is valid when it exists as a file, or when it is a bare
/// program name that resolves on `PATH`
fn is_valid_executable(executable: &str) -> bool {
    if executable.is_empty() {
        return false;
    }

    let path = Path::new(executable);
    if path.is_file() {
        return true;
    }

    path.components().count() == 1 && which::which(executable).is_ok()
}

/// Accept the port as either a TOML integer or a string
fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(i64),
        Text(String),
    }

    Ok(match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => n.to_string(),
        PortValue::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> DaemonConfig {
        DaemonConfig {
            document_root: dir.to_path_buf(),
            temp_dir: dir.to_path_buf(),
            executable: "sh".to_string(),
            ..DaemonConfig::default()
        }
    }

    #[test]
    fn test_interface_validation() {
        for valid in ["127.0.0.1", "::1", "[::1]", "localhost", "web-1.example.com", "0.0.0.0"] {
            assert!(is_valid_interface(valid), "{} should be valid", valid);
        }
        for invalid in ["", "1", "256.1.1.1", "bad host", "-leading.com", "under_score", "a..b"] {
            assert!(!is_valid_interface(invalid), "{} should be invalid", invalid);
        }
    }

    #[test]
    fn test_derived_paths_are_namespaced_by_uid() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.uid = "docs".to_string();

        let validated = config.validate().unwrap();
        assert_eq!(validated.pid_file(), dir.path().join("docs.pid"));
        assert_eq!(validated.log_file(), dir.path().join("docs.log"));
        assert_eq!(validated.port(), 8000);
    }

    #[test]
    fn test_commandline_is_resolved() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let validated = config.validate().unwrap();

        let expected = format!(
            "sh -S 127.0.0.1:8000 -t {} >> {} 2>&1 & echo $!",
            dir.path().display(),
            dir.path().join("webserver.log").display()
        );
        assert_eq!(validated.commandline(), expected);
    }

    #[test]
    fn test_uid_may_not_escape_temp_dir() {
        let dir = tempdir().unwrap();
        for uid in ["", "../evil", "a/b", ".."] {
            let mut config = config_in(dir.path());
            config.uid = uid.to_string();
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidUid { .. })
            ));
        }
    }

    #[test]
    fn test_port_accepts_number_or_string_in_toml() {
        let numeric: DaemonConfig = toml::from_str("port = 9000").unwrap();
        assert_eq!(numeric.port, "9000");

        let text: DaemonConfig = toml::from_str("port = \"three\"").unwrap();
        assert_eq!(text.port, "three");
    }
}
