//! Termination requests
//!
//! Sends a termination request through the external signal tool. Success
//! means the request was accepted, not that the process has exited.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::{tool_available, tool_unavailable};
use crate::error::EnvironmentError;
use crate::types::ProcessId;

/// How a termination request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The signal tool accepted the request
    Delivered,

    /// The signal tool is present but refused, e.g. the process is already gone
    Refused,
}

/// Requests termination of an identifier
pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, pid: &ProcessId) -> Result<Termination, EnvironmentError>;
}

/// Terminator backed by an external signaler invoked as `<signaler> <pid>`
#[derive(Debug, Clone)]
pub struct CommandTerminator {
    signaler: String,
}

impl CommandTerminator {
    pub fn new(signaler: impl Into<String>) -> Self {
        Self {
            signaler: signaler.into(),
        }
    }
}

impl Default for CommandTerminator {
    fn default() -> Self {
        Self::new("kill")
    }
}

/// Whether `pid` names exactly one process when handed to the signaler
///
/// `0` and negative values address process groups, and a leading `-` would
/// be read as an option, so only positive decimal integers qualify.
pub fn is_signalable(pid: &ProcessId) -> bool {
    let token = pid.as_str();
    !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && token.bytes().any(|b| b != b'0')
}

impl ProcessTerminator for CommandTerminator {
    fn terminate(&self, pid: &ProcessId) -> Result<Termination, EnvironmentError> {
        if !is_signalable(pid) {
            warn!("Refusing to signal '{}': not a single process identifier", pid);
            return Ok(Termination::Refused);
        }

        let commandline = format!("{} {}", self.signaler, pid);
        debug!("Sending termination request: {}", commandline);

        let output = Command::new(&self.signaler)
            .arg(pid.as_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                warn!("Failed to run signal tool '{}': {}", self.signaler, e);
                tool_unavailable(&self.signaler, commandline.clone())
            })?;

        if output.status.success() {
            return Ok(Termination::Delivered);
        }

        if !tool_available(&self.signaler) {
            return Err(tool_unavailable(&self.signaler, commandline));
        }

        debug!(
            "Signal tool refused PID {} ({}): {}",
            pid,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(Termination::Refused)
    }
}
