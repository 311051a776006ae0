//! Liveness probing
//!
//! Asks the process lister whether an identifier refers to a live process.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::{tool_available, tool_unavailable};
use crate::error::EnvironmentError;
use crate::types::ProcessId;

/// Reports whether an identifier currently refers to a live process
pub trait ProcessProbe: Send + Sync {
    /// Probe `pid`
    ///
    /// Returns the lister line proving the process is alive, `None` when it
    /// is not, or an error when liveness cannot be determined at all.
    fn probe(&self, pid: &ProcessId) -> Result<Option<String>, EnvironmentError>;

    /// Convenience wrapper around [`ProcessProbe::probe`]
    fn is_alive(&self, pid: &ProcessId) -> Result<bool, EnvironmentError> {
        Ok(self.probe(pid)?.is_some())
    }
}

/// Probe backed by an external lister invoked as `<lister> -p <pid>`
#[derive(Debug, Clone)]
pub struct CommandProbe {
    lister: String,
}

impl CommandProbe {
    pub fn new(lister: impl Into<String>) -> Self {
        Self {
            lister: lister.into(),
        }
    }
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new("ps")
    }
}

impl ProcessProbe for CommandProbe {
    fn probe(&self, pid: &ProcessId) -> Result<Option<String>, EnvironmentError> {
        let commandline = format!("{} -p {}", self.lister, pid);
        debug!("Probing process: {}", commandline);

        let output = Command::new(&self.lister)
            .arg("-p")
            .arg(pid.as_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                warn!("Failed to run process lister '{}': {}", self.lister, e);
                tool_unavailable(&self.lister, commandline.clone())
            })?;

        if !output.status.success() {
            // The lister also fails for unknown identifiers; only a missing
            // tool turns this into an error.
            if !tool_available(&self.lister) {
                return Err(tool_unavailable(&self.lister, commandline));
            }
            debug!("Process lister exited with {} for PID {}", output.status, pid);
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(find_evidence(&stdout, pid))
    }
}

/// Find the first line naming `pid` as one of its whitespace-separated fields
///
/// A header-only listing exits zero too, so success alone proves nothing.
pub fn find_evidence(listing: &str, pid: &ProcessId) -> Option<String> {
    listing
        .lines()
        .find(|line| line.split_whitespace().any(|field| field == pid.as_str()))
        .map(|line| line.trim_end().to_string())
}
