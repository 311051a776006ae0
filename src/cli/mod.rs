//! CLI command implementations
//!
//! Command-line options override values from the TOML configuration file,
//! which override the built-in defaults.

use std::path::PathBuf;

use clap::Args;
use tracing::debug;
use tracing::level_filters::LevelFilter;
use webserverd_core::config::toml_config;
use webserverd_core::error::DaemonError;
use webserverd_core::DaemonConfig;

pub mod daemon;

/// Options describing the supervised web server
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// TOML configuration file (defaults to $WEBSERVERD_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Interface to listen on (hostname or IP address)
    #[arg(long, global = true)]
    pub interface: Option<String>,

    /// Port to listen on
    #[arg(long, global = true)]
    pub port: Option<String>,

    /// Document root to serve from
    #[arg(long, global = true)]
    pub document_root: Option<PathBuf>,

    /// Identifier namespacing the PID and log files
    #[arg(long, global = true)]
    pub uid: Option<String>,

    /// Executable to launch
    #[arg(long, global = true)]
    pub executable: Option<String>,

    /// Directory for PID and log files
    #[arg(long, global = true)]
    pub temp_dir: Option<PathBuf>,

    /// Command template with five slots: executable, interface, port, document root, log file
    #[arg(long, global = true)]
    pub command_template: Option<String>,

    /// Milliseconds to wait for the server to exit after stopping it
    #[arg(long, global = true)]
    pub stop_timeout_ms: Option<u64>,
}

/// Build the daemon configuration from file, environment and flags
pub fn load_config(args: &ConfigArgs) -> Result<DaemonConfig, DaemonError> {
    let mut config = match args.config.clone().or_else(toml_config::env_config_path) {
        Some(path) => {
            debug!("Loading configuration from {:?}", path);
            toml_config::load_config_from_path(path)?
        }
        None => DaemonConfig::default(),
    };

    if let Some(interface) = &args.interface {
        config.interface = interface.clone();
    }
    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(document_root) = &args.document_root {
        config.document_root = document_root.clone();
    }
    if let Some(uid) = &args.uid {
        config.uid = uid.clone();
    }
    if let Some(executable) = &args.executable {
        config.executable = executable.clone();
    }
    if let Some(temp_dir) = &args.temp_dir {
        config.temp_dir = temp_dir.clone();
    }
    if let Some(template) = &args.command_template {
        config.command_template = template.clone();
    }
    if let Some(timeout) = args.stop_timeout_ms {
        config.stop_timeout_ms = timeout;
    }

    Ok(config)
}

/// Map the `-v` count to a log level
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}
