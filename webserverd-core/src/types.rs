//! Type definitions shared by the supervisor and its collaborators
//!
//! Process identifiers are kept as opaque text exactly as the operating
//! environment printed them; nothing in the crate coerces them to numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a supervised process
///
/// An opaque token (in practice a small integer) as echoed by the shell
/// that backgrounded the daemon. Stored trimmed, compared textually.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Create an identifier from raw text, returning `None` when the trimmed
    /// text is empty
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The identifier as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        Self(pid.to_string())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observable state of a supervised daemon
///
/// There is no intermediate starting or stopping state: every supervisor
/// operation is synchronous from the caller's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DaemonState {
    /// No live process is known
    Stopped,

    /// A live process is known
    Running { pid: ProcessId },
}

impl DaemonState {
    /// Check if the daemon is running
    pub fn is_running(&self) -> bool {
        matches!(self, DaemonState::Running { .. })
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Stopped => write!(f, "stopped"),
            DaemonState::Running { pid } => write!(f, "running (PID: {})", pid),
        }
    }
}

/// Result of a supervisor operation
///
/// `success` carries the boolean outcome, `message` the human-readable
/// status line. No-ops such as starting an already running daemon are
/// reported here rather than raised as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(flatten)]
    pub state: DaemonState,
    pub message: String,
}

impl Outcome {
    pub fn new(success: bool, state: DaemonState, message: String) -> Self {
        Self {
            success,
            state,
            message,
        }
    }
}
