//! Core library for the webserverd supervisor
//!
//! This crate starts a web server detached from the caller, records its
//! identity in a per-uid PID file, reports whether it is alive, and stops or
//! restarts it through external process tools.

pub mod error;
pub mod types;

pub mod config;
pub mod pid_store;
pub mod process;
pub mod supervisor;

pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
pub use supervisor::Supervisor;
pub use types::{DaemonState, Outcome, ProcessId};

use tracing::level_filters::LevelFilter;

/// Initialize logging infrastructure
///
/// Logs to the systemd journal when running under systemd, otherwise to
/// stderr so that stdout carries only status lines.
pub fn init_logging(level: LevelFilter) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Try to use systemd journal logging if available
    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(level)
                .try_init()?;
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(level)
        .try_init()?;

    Ok(())
}
