//! Daemon supervision
//!
//! Composes the PID store, probe, terminator and launcher into the
//! `start` / `stop` / `restart` / `status` state machine.
//!
//! The PID file is the source of truth; the in-memory identifier is only a
//! cache of it, filled lazily so a new supervisor can discover a daemon
//! started by an earlier one, and never trusted without a probe.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{DaemonConfig, ValidatedConfig};
use crate::error::Result;
use crate::pid_store::PidStore;
use crate::process::{
    CommandProbe, CommandTerminator, ProcessLauncher, ProcessProbe, ProcessTerminator,
    ShellLauncher, Termination,
};
use crate::types::{DaemonState, Outcome, ProcessId};

/// Interval between liveness probes while waiting for a stopped daemon to exit
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Supervises one detached daemon identified by its uid
pub struct Supervisor {
    config: ValidatedConfig,
    pid_store: PidStore,
    pid: Option<ProcessId>,
    probe: Box<dyn ProcessProbe>,
    terminator: Box<dyn ProcessTerminator>,
    launcher: Box<dyn ProcessLauncher>,
}

impl Supervisor {
    /// Create a supervisor driving the configured external tools
    ///
    /// Fails with a configuration error, and creates no files, when any
    /// configuration field is invalid.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let validated = config.validate()?;
        let tools = validated.tools().clone();

        Ok(Self::from_validated(
            validated,
            Box::new(CommandProbe::new(tools.lister)),
            Box::new(CommandTerminator::new(tools.signaler)),
            Box::new(ShellLauncher::new(tools.shell)),
        ))
    }

    /// Create a supervisor with substituted process capabilities
    pub fn with_tools(
        config: DaemonConfig,
        probe: Box<dyn ProcessProbe>,
        terminator: Box<dyn ProcessTerminator>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Result<Self> {
        let validated = config.validate()?;
        Ok(Self::from_validated(validated, probe, terminator, launcher))
    }

    fn from_validated(
        config: ValidatedConfig,
        probe: Box<dyn ProcessProbe>,
        terminator: Box<dyn ProcessTerminator>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        let pid_store = PidStore::new(config.pid_file());
        Self {
            config,
            pid_store,
            pid: None,
            probe,
            terminator,
            launcher,
        }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn uid(&self) -> &str {
        self.config.uid()
    }

    pub fn log_file(&self) -> &Path {
        self.config.log_file()
    }

    pub fn pid_file(&self) -> &Path {
        self.config.pid_file()
    }

    pub fn commandline(&self) -> &str {
        self.config.commandline()
    }

    /// Return the known identifier, reading the PID file if none is cached
    pub fn pid(&mut self) -> Result<Option<ProcessId>> {
        if self.pid.is_none() {
            self.pid = self.pid_store.read()?;
            if let Some(pid) = &self.pid {
                debug!("Recovered PID {} from {:?}", pid, self.pid_store.path());
            }
        }
        Ok(self.pid.clone())
    }

    /// Report whether the daemon is running
    ///
    /// A PID file naming a process that no longer exists is removed here,
    /// so callers that only ever poll status still get stale files cleaned.
    pub fn status(&mut self) -> Result<Outcome> {
        let Some(pid) = self.pid()? else {
            return Ok(Outcome::new(
                false,
                DaemonState::Stopped,
                format!("webserver-daemon (UID: {}) not running.", self.uid()),
            ));
        };

        match self.probe.probe(&pid)? {
            Some(evidence) => Ok(Outcome::new(
                true,
                DaemonState::Running { pid: pid.clone() },
                format!(
                    "webserver-daemon (UID: {}) process (PID: {}) running ...\n{}",
                    self.uid(),
                    pid,
                    evidence
                ),
            )),
            None => {
                warn!("Removing stale PID file for vanished process {}", pid);
                self.forget();
                Ok(Outcome::new(
                    false,
                    DaemonState::Stopped,
                    format!(
                        "webserver-daemon (UID: {}) process (PID: {}) not found!",
                        self.uid(),
                        pid
                    ),
                ))
            }
        }
    }

    /// Start the daemon unless it is already running
    ///
    /// `restarted` only changes the wording of the status line.
    pub fn start(&mut self, restarted: bool) -> Result<Outcome> {
        let current = self.status()?;
        if let DaemonState::Running { pid } = &current.state {
            info!("Daemon {} already running as PID {}", self.uid(), pid);
            let message = format!(
                "webserver-daemon (UID: {}) process (PID: {}) already running!",
                self.uid(),
                pid
            );
            return Ok(Outcome::new(false, current.state.clone(), message));
        }

        let pid = self.launcher.launch(
            self.config.commandline(),
            self.config.temp_dir(),
            self.config.log_file(),
        )?;

        self.pid = Some(pid.clone());
        if let Err(e) = self.pid_store.write(&pid) {
            warn!(
                "Daemon {} runs as PID {} but {:?} could not be written: {}",
                self.uid(),
                pid,
                self.pid_file(),
                e
            );
            self.append_log_note(&format!("start: PID {} not recorded: {}", pid, e));
            return Err(e.into());
        }
        info!("Started daemon {} as PID {}", self.uid(), pid);

        let message = format!(
            "webserver-daemon (UID: {}) process (PID: {}) {}.",
            self.uid(),
            pid,
            if restarted { "restarted" } else { "started" }
        );
        Ok(Outcome::new(true, DaemonState::Running { pid }, message))
    }

    /// Stop the daemon if one is known
    ///
    /// A refused termination request is treated like a process that is
    /// already gone; only a missing signal tool is an error.
    pub fn stop(&mut self) -> Result<Outcome> {
        let Some(pid) = self.pid()? else {
            return Ok(Outcome::new(
                false,
                DaemonState::Stopped,
                format!(
                    "webserver-daemon (UID: {}) not running so it could not be stopped.",
                    self.uid()
                ),
            ));
        };

        match self.terminator.terminate(&pid)? {
            Termination::Delivered => self.wait_for_exit(&pid),
            Termination::Refused => {
                debug!("Termination of PID {} refused, assuming it is gone", pid)
            }
        }

        self.forget();
        info!("Stopped daemon {} (PID {})", self.uid(), pid);

        Ok(Outcome::new(
            true,
            DaemonState::Stopped,
            format!(
                "webserver-daemon (UID: {}) process (PID: {}) stopped.",
                self.uid(),
                pid
            ),
        ))
    }

    /// Stop then start the daemon
    ///
    /// A failing stop never blocks the start. The old identifier is dropped
    /// so a fresh daemon is launched, and the stop error is appended to the
    /// log file once the start attempt has finished instead of returned.
    pub fn restart(&mut self) -> Result<Outcome> {
        let stop_error = match self.stop() {
            Ok(_) => None,
            Err(e) => {
                warn!("Stop during restart of {} failed: {}", self.uid(), e);
                self.forget();
                Some(e.to_string())
            }
        };

        let outcome = self.start(true);

        if let Some(error) = stop_error {
            self.append_log_note(&format!("restart: stop failed: {}", error));
        }

        outcome
    }

    /// Clear the cached identifier and the PID file; the log file stays
    fn forget(&mut self) {
        self.pid = None;
        self.pid_store.remove();
    }

    /// Wait up to the configured stop timeout for `pid` to disappear
    fn wait_for_exit(&self, pid: &ProcessId) {
        let timeout = self.config.stop_timeout();
        if timeout.is_zero() {
            return;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.probe.is_alive(pid) {
                Ok(false) => return,
                Ok(true) => {}
                Err(e) => {
                    warn!("Could not confirm PID {} exited: {}", pid, e);
                    return;
                }
            }

            if Instant::now() >= deadline {
                warn!("PID {} still alive {:?} after termination request", pid, timeout);
                return;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
    }

    /// Append a timestamped line to the log file, best effort
    fn append_log_note(&self, note: &str) {
        let line = format!("[{}] {}\n", chrono::Utc::now().to_rfc3339(), note);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file())
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = written {
            warn!("Failed to append to log file {:?}: {}", self.log_file(), e);
        }
    }
}
