//! Daemon lifecycle commands
//!
//! Each command runs one supervisor operation, prints its status line (or
//! JSON) and returns the process exit code.

use colored::Colorize;
use serde::Serialize;
use webserverd_core::error::DaemonError;
use webserverd_core::{Outcome, ProcessId, Supervisor};

/// Exit code when `status` finds nothing running or `pid` has no identifier
pub const EXIT_NOT_RUNNING: i32 = 3;

#[derive(Serialize)]
struct PidReport<'a> {
    uid: &'a str,
    pid: Option<&'a ProcessId>,
}

/// Run the start command
pub fn run_start(supervisor: &mut Supervisor, json: bool) -> Result<i32, DaemonError> {
    let outcome = supervisor.start(false)?;
    print_outcome(&outcome, json)?;
    Ok(0)
}

/// Run the stop command
pub fn run_stop(supervisor: &mut Supervisor, json: bool) -> Result<i32, DaemonError> {
    let outcome = supervisor.stop()?;
    print_outcome(&outcome, json)?;
    Ok(0)
}

/// Run the restart command
pub fn run_restart(supervisor: &mut Supervisor, json: bool) -> Result<i32, DaemonError> {
    let outcome = supervisor.restart()?;
    print_outcome(&outcome, json)?;
    Ok(0)
}

/// Run the status command
pub fn run_status(supervisor: &mut Supervisor, json: bool) -> Result<i32, DaemonError> {
    let outcome = supervisor.status()?;
    print_outcome(&outcome, json)?;
    Ok(if outcome.state.is_running() {
        0
    } else {
        EXIT_NOT_RUNNING
    })
}

/// Run the pid command
pub fn run_pid(supervisor: &mut Supervisor, json: bool) -> Result<i32, DaemonError> {
    let pid = supervisor.pid()?;

    if json {
        let report = PidReport {
            uid: supervisor.uid(),
            pid: pid.as_ref(),
        };
        println!("{}", to_json(&report)?);
    } else if let Some(pid) = &pid {
        println!("{}", pid);
    }

    Ok(if pid.is_some() { 0 } else { EXIT_NOT_RUNNING })
}

fn print_outcome(outcome: &Outcome, json: bool) -> Result<(), DaemonError> {
    if json {
        println!("{}", to_json(outcome)?);
    } else if outcome.success {
        println!("{}", outcome.message.green());
    } else {
        println!("{}", outcome.message.yellow());
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, DaemonError> {
    serde_json::to_string_pretty(value).map_err(|e| DaemonError::Io(e.into()))
}
