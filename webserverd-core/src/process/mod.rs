//! External process interaction
//!
//! The supervisor never talks to the operating system directly. It goes
//! through three capabilities: a probe reporting liveness of an identifier,
//! a terminator requesting termination of one, and a launcher spawning the
//! daemon detached. Each has one implementation backed by an external tool,
//! and an in-memory one for tests.

pub mod launcher;
pub mod probe;
pub mod terminator;

#[cfg(any(test, feature = "mock-process"))]
pub mod mock;

pub use launcher::{ProcessLauncher, ShellLauncher};
pub use probe::{CommandProbe, ProcessProbe};
pub use terminator::{CommandTerminator, ProcessTerminator, Termination};

use crate::error::EnvironmentError;

/// Check whether `tool` can be found, either as a path or on `PATH`
///
/// Used as the secondary check after a tool reported failure, to tell
/// "the tool said no" apart from "the tool is not there".
pub fn tool_available(tool: &str) -> bool {
    which::which(tool).is_ok()
}

fn tool_unavailable(tool: &str, commandline: String) -> EnvironmentError {
    EnvironmentError::ToolUnavailable {
        tool: tool.to_string(),
        commandline,
    }
}
