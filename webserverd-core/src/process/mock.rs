//! Mock process table for testing
//!
//! Provides an in-memory stand-in for the process lister, the signal tool
//! and the launch shell, so the supervisor state machine can be exercised
//! without spawning real processes.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{EnvironmentError, LaunchError};
use crate::types::ProcessId;

use super::{ProcessLauncher, ProcessProbe, ProcessTerminator, Termination};

#[derive(Debug)]
struct Table {
    alive: BTreeSet<String>,
    next_pid: u32,
    lister_available: bool,
    signaler_available: bool,
    refuse_signals: bool,
    silent_launch: bool,
    launches: usize,
    signals: usize,
}

/// Shared in-memory process table
///
/// Clones share the same table; the probe, terminator and launcher handed
/// out by [`MockProcessTable::probe`] and friends all see one another's
/// effects.
#[derive(Debug, Clone)]
pub struct MockProcessTable {
    table: Arc<Mutex<Table>>,
}

impl Default for MockProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessTable {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                alive: BTreeSet::new(),
                next_pid: 1000,
                lister_available: true,
                signaler_available: true,
                refuse_signals: false,
                silent_launch: false,
                launches: 0,
                signals: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn probe(&self) -> Box<dyn ProcessProbe> {
        Box::new(MockProbe(self.clone()))
    }

    pub fn terminator(&self) -> Box<dyn ProcessTerminator> {
        Box::new(MockTerminator(self.clone()))
    }

    pub fn launcher(&self) -> Box<dyn ProcessLauncher> {
        Box::new(MockLauncher(self.clone()))
    }

    /// Start a process outside the supervisor's control
    pub fn spawn_external(&self) -> ProcessId {
        let mut table = self.lock();
        table.next_pid += 1;
        let pid = ProcessId::from(table.next_pid);
        table.alive.insert(pid.as_str().to_string());
        pid
    }

    /// Make a process vanish without the supervisor noticing (e.g. a crash)
    pub fn kill_externally(&self, pid: &ProcessId) {
        self.lock().alive.remove(pid.as_str());
    }

    pub fn is_alive(&self, pid: &ProcessId) -> bool {
        self.lock().alive.contains(pid.as_str())
    }

    pub fn alive_count(&self) -> usize {
        self.lock().alive.len()
    }

    /// Simulate the process lister missing from the environment
    pub fn set_lister_available(&self, available: bool) {
        self.lock().lister_available = available;
    }

    /// Simulate the signal tool missing from the environment
    pub fn set_signaler_available(&self, available: bool) {
        self.lock().signaler_available = available;
    }

    /// Make the signal tool report failure while staying available
    pub fn set_refuse_signals(&self, refuse: bool) {
        self.lock().refuse_signals = refuse;
    }

    /// Make launches print nothing, as a failing daemon commandline would
    pub fn set_silent_launch(&self, silent: bool) {
        self.lock().silent_launch = silent;
    }

    pub fn launch_count(&self) -> usize {
        self.lock().launches
    }

    pub fn signal_count(&self) -> usize {
        self.lock().signals
    }
}

struct MockProbe(MockProcessTable);

impl ProcessProbe for MockProbe {
    fn probe(&self, pid: &ProcessId) -> Result<Option<String>, EnvironmentError> {
        let table = self.0.lock();
        if !table.lister_available {
            return Err(EnvironmentError::ToolUnavailable {
                tool: "mock-ps".to_string(),
                commandline: format!("mock-ps -p {}", pid),
            });
        }
        Ok(table
            .alive
            .contains(pid.as_str())
            .then(|| format!("{:>7} ?        00:00:00 mock-server", pid.as_str())))
    }
}

struct MockTerminator(MockProcessTable);

impl ProcessTerminator for MockTerminator {
    fn terminate(&self, pid: &ProcessId) -> Result<Termination, EnvironmentError> {
        let mut table = self.0.lock();
        if !table.signaler_available {
            return Err(EnvironmentError::ToolUnavailable {
                tool: "mock-kill".to_string(),
                commandline: format!("mock-kill {}", pid),
            });
        }
        table.signals += 1;
        if table.refuse_signals || !table.alive.remove(pid.as_str()) {
            return Ok(Termination::Refused);
        }
        Ok(Termination::Delivered)
    }
}

struct MockLauncher(MockProcessTable);

impl ProcessLauncher for MockLauncher {
    fn launch(
        &self,
        _commandline: &str,
        _working_dir: &Path,
        log_file: &Path,
    ) -> Result<ProcessId, LaunchError> {
        let silent = {
            let mut table = self.0.lock();
            table.launches += 1;
            table.silent_launch
        };
        if silent {
            return Err(LaunchError::NoIdentifier {
                log_file: log_file.to_path_buf(),
            });
        }
        Ok(self.0.spawn_external())
    }
}
