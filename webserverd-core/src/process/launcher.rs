//! Detached daemon launch
//!
//! Runs the resolved commandline through a shell. The commandline is
//! expected to background the daemon and echo its identifier; that single
//! line of output is the launch result. The child handle is dropped once
//! the shell has exited, so liveness is only ever rediscovered through the
//! identifier and a probe.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::LaunchError;
use crate::types::ProcessId;

/// Spawns a commandline detached and returns the identifier it echoes
pub trait ProcessLauncher: Send + Sync {
    fn launch(
        &self,
        commandline: &str,
        working_dir: &Path,
        log_file: &Path,
    ) -> Result<ProcessId, LaunchError>;
}

/// Launcher running the commandline as `<shell> -c <commandline>`
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
}

impl ShellLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ProcessLauncher for ShellLauncher {
    fn launch(
        &self,
        commandline: &str,
        working_dir: &Path,
        log_file: &Path,
    ) -> Result<ProcessId, LaunchError> {
        // stderr goes to the log in append mode so output survives restarts
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| LaunchError::LogFile {
                reason: e.to_string(),
                log_file: log_file.to_path_buf(),
            })?;

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(commandline)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log));

        // Own process group: terminal signals aimed at the caller must not
        // reach the daemon.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        debug!("Launching: {} -c {:?}", self.shell, commandline);
        let mut child = command.spawn().map_err(|e| LaunchError::Spawn {
            reason: e.to_string(),
            log_file: log_file.to_path_buf(),
        })?;

        let mut line = String::new();
        if let Some(stdout) = child.stdout.take() {
            if let Err(e) = BufReader::new(stdout).read_line(&mut line) {
                warn!("Failed to read launched identifier: {}", e);
            }
        }

        match child.wait() {
            Ok(status) => debug!("Launch shell exited with {}", status),
            Err(e) => warn!("Failed to reap launch shell: {}", e),
        }

        ProcessId::parse(&line).ok_or_else(|| LaunchError::NoIdentifier {
            log_file: log_file.to_path_buf(),
        })
    }
}
