//! Error types for the webserverd supervisor
//!
//! This module defines all error types used throughout the application,
//! separating configuration mistakes from failures of the external tools
//! the supervisor drives.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the webserverd application
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Errors related to supervisor configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The daemon could not be launched
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// A required external tool is missing from the environment
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
///
/// Raised while validating a [`crate::config::DaemonConfig`]; a supervisor is
/// never constructed from a configuration that produced one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please pass a valid hostname or a valid IPv4/IPv6 address as interface. You passed \"{value}\".")]
    InvalidInterface { value: String },

    #[error("Please pass a valid port. You passed \"{value}\".")]
    InvalidPort { value: String },

    #[error("Please pass a valid directory as document root. You passed \"{path}\".")]
    InvalidDocumentRoot { path: String },

    #[error("Please pass a valid UID. You passed \"{value}\".")]
    InvalidUid { value: String },

    #[error("Please pass a valid executable. You passed \"{path}\".")]
    InvalidExecutable { path: String },

    #[error("Please pass a valid temporary directory. You passed \"{path}\".")]
    InvalidTempDir { path: String },

    #[error("Invalid command template \"{template}\": {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Errors raised while spawning the daemon
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Error while starting webserver ({reason}). See \"{}\" for details.", .log_file.display())]
    Spawn { reason: String, log_file: PathBuf },

    #[error("Error while starting webserver. See \"{}\" for details.", .log_file.display())]
    NoIdentifier { log_file: PathBuf },

    #[error("Error opening log file \"{}\": {reason}", .log_file.display())]
    LogFile { reason: String, log_file: PathBuf },
}

/// Errors raised when the execution environment lacks a required tool
///
/// Distinct from "process not found", which is a normal negative result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Required tool \"{tool}\" is not available (commandline: \"{commandline}\")")]
    ToolUnavailable { tool: String, commandline: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DaemonError>;
