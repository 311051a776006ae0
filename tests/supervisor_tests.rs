//! Integration tests for the supervisor state machine
//!
//! Every test runs against the in-memory process table, so no real process
//! is spawned; the PID and log files are real files in a scratch directory.

use std::fs;

use tempfile::{tempdir, TempDir};
use webserverd_core::error::{DaemonError, LaunchError};
use webserverd_core::process::mock::MockProcessTable;
use webserverd_core::{DaemonConfig, DaemonState, ProcessId, Supervisor};

struct Fixture {
    dir: TempDir,
    table: MockProcessTable,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
            table: MockProcessTable::new(),
        }
    }

    fn config(&self, uid: &str) -> DaemonConfig {
        DaemonConfig {
            document_root: self.dir.path().to_path_buf(),
            temp_dir: self.dir.path().to_path_buf(),
            executable: "sh".to_string(),
            uid: uid.to_string(),
            ..DaemonConfig::default()
        }
    }

    fn supervisor(&self, uid: &str) -> Supervisor {
        Supervisor::with_tools(
            self.config(uid),
            self.table.probe(),
            self.table.terminator(),
            self.table.launcher(),
        )
        .expect("Failed to build supervisor")
    }

    fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

#[test]
fn test_fresh_uid_is_stopped_and_touches_nothing() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("fresh");

    let outcome = supervisor.status().unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.state, DaemonState::Stopped);
    assert_eq!(outcome.message, "webserver-daemon (UID: fresh) not running.");
    assert!(fixture.files().is_empty());
}

#[test]
fn test_start_persists_identifier() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");

    let outcome = supervisor.start(false).unwrap();
    let pid = supervisor.pid().unwrap().expect("PID after start");

    assert!(outcome.success);
    assert_eq!(outcome.state, DaemonState::Running { pid: pid.clone() });
    assert!(!pid.as_str().is_empty());
    assert_eq!(fs::read_to_string(supervisor.pid_file()).unwrap(), pid.as_str());
}

#[test]
fn test_second_start_is_reported_noop() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");

    let first = supervisor.start(false).unwrap();
    let pid = supervisor.pid().unwrap().unwrap();
    let second = supervisor.start(false).unwrap();

    assert!(first.success);
    assert!(first.message.ends_with("started."));
    assert!(!second.success);
    assert_eq!(
        second.message,
        format!(
            "webserver-daemon (UID: web) process (PID: {}) already running!",
            pid
        )
    );
    assert_eq!(supervisor.pid().unwrap(), Some(pid.clone()));
    assert_eq!(fs::read_to_string(supervisor.pid_file()).unwrap(), pid.as_str());
    assert_eq!(fixture.table.launch_count(), 1);
}

#[test]
fn test_stop_running_instance() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    let pid = supervisor.pid().unwrap().unwrap();

    let outcome = supervisor.stop().unwrap();

    assert!(outcome.success);
    assert_eq!(
        outcome.message,
        format!("webserver-daemon (UID: web) process (PID: {}) stopped.", pid)
    );
    assert!(!supervisor.pid_file().exists());
    assert!(!fixture.table.is_alive(&pid));
    assert_eq!(supervisor.status().unwrap().state, DaemonState::Stopped);
}

#[test]
fn test_stop_keeps_log_file() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    fs::write(supervisor.log_file(), "server output\n").unwrap();

    supervisor.stop().unwrap();

    assert_eq!(fixture.files(), vec!["web.log".to_string()]);
}

#[test]
fn test_stop_when_stopped_is_noop() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("idle");

    let outcome = supervisor.stop().unwrap();

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "webserver-daemon (UID: idle) not running so it could not be stopped."
    );
    assert!(fixture.files().is_empty());
    assert_eq!(fixture.table.signal_count(), 0);
}

#[test]
fn test_refused_signal_still_counts_as_stopped() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    fixture.table.set_refuse_signals(true);

    let outcome = supervisor.stop().unwrap();

    assert!(outcome.success);
    assert!(!supervisor.pid_file().exists());
}

#[test]
fn test_missing_signal_tool_is_fatal_and_keeps_pid_file() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    fixture.table.set_signaler_available(false);

    let result = supervisor.stop();

    assert!(matches!(result, Err(DaemonError::Environment(_))));
    assert!(supervisor.pid_file().exists());
}

#[test]
fn test_restart_running_instance_gets_new_identifier() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    let before = supervisor.pid().unwrap().unwrap();

    let outcome = supervisor.restart().unwrap();
    let after = supervisor.pid().unwrap().unwrap();

    assert!(outcome.success);
    assert!(outcome.state.is_running());
    assert_ne!(before, after);
    assert!(!fixture.table.is_alive(&before));
    assert_eq!(
        outcome.message,
        format!("webserver-daemon (UID: web) process (PID: {}) restarted.", after)
    );
    assert_eq!(fs::read_to_string(supervisor.pid_file()).unwrap(), after.as_str());
}

#[test]
fn test_restart_when_stopped_starts() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");

    let outcome = supervisor.restart().unwrap();

    assert!(outcome.success);
    assert!(outcome.message.ends_with("restarted."));
    assert_eq!(fixture.table.alive_count(), 1);
}

#[test]
fn test_restart_survives_failing_stop() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    let before = supervisor.pid().unwrap().unwrap();

    // The server crashes and the signal tool disappears
    fixture.table.kill_externally(&before);
    fixture.table.set_signaler_available(false);

    let outcome = supervisor.restart().unwrap();
    let after = supervisor.pid().unwrap().unwrap();

    assert!(outcome.success);
    assert!(outcome.state.is_running());
    assert_ne!(before, after);

    let log = fs::read_to_string(supervisor.log_file()).unwrap();
    assert!(log.contains("restart: stop failed:"));
    assert!(log.contains("mock-kill"));
}

#[test]
fn test_restart_of_running_daemon_with_missing_signaler_launches_fresh() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    let before = supervisor.pid().unwrap().unwrap();

    fixture.table.set_signaler_available(false);

    let outcome = supervisor.restart().unwrap();
    let after = supervisor.pid().unwrap().unwrap();

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.state, DaemonState::Running { pid: after.clone() });
    assert_ne!(before, after);
    assert_eq!(fs::read_to_string(supervisor.pid_file()).unwrap(), after.as_str());
    assert_eq!(
        outcome.message,
        format!("webserver-daemon (UID: web) process (PID: {}) restarted.", after)
    );

    let log = fs::read_to_string(supervisor.log_file()).unwrap();
    assert!(log.contains("restart: stop failed:"));
}

#[test]
fn test_stale_pid_file_is_cleaned_by_status() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    let pid = supervisor.pid().unwrap().unwrap();
    fs::write(supervisor.log_file(), "keep me\n").unwrap();

    fixture.table.kill_externally(&pid);
    let outcome = supervisor.status().unwrap();

    assert_eq!(outcome.state, DaemonState::Stopped);
    assert_eq!(
        outcome.message,
        format!("webserver-daemon (UID: web) process (PID: {}) not found!", pid)
    );
    assert!(!supervisor.pid_file().exists());
    assert!(supervisor.log_file().exists());

    // Once cleaned, the instance reads as never started
    let again = supervisor.status().unwrap();
    assert_eq!(again.message, "webserver-daemon (UID: web) not running.");
}

#[test]
fn test_stale_pid_file_from_previous_run_does_not_block_start() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    fs::write(supervisor.pid_file(), "424242").unwrap();

    let outcome = supervisor.start(false).unwrap();

    assert!(outcome.success);
    let pid = supervisor.pid().unwrap().unwrap();
    assert_ne!(pid.as_str(), "424242");
}

#[test]
fn test_second_supervisor_observes_first() {
    let fixture = Fixture::new();
    let mut first = fixture.supervisor("shared");
    let mut second = fixture.supervisor("shared");

    assert!(!second.status().unwrap().state.is_running());

    first.start(false).unwrap();
    let pid = first.pid().unwrap().unwrap();

    let seen = second.status().unwrap();
    assert_eq!(seen.state, DaemonState::Running { pid: pid.clone() });
    assert!(!second.start(false).unwrap().success);

    assert!(second.stop().unwrap().success);
    assert!(!first.pid_file().exists());

    // The first instance's cache is stale now; its status must probe
    let after = first.status().unwrap();
    assert_eq!(after.state, DaemonState::Stopped);
}

#[test]
fn test_different_uids_are_independent() {
    let fixture = Fixture::new();
    let mut docs = fixture.supervisor("docs");
    let mut api = fixture.supervisor("api");

    docs.start(false).unwrap();

    assert!(!api.status().unwrap().state.is_running());
    assert!(api.start(false).unwrap().success);
    assert_ne!(docs.pid().unwrap(), api.pid().unwrap());
}

#[test]
fn test_launch_without_identifier_is_fatal() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    fixture.table.set_silent_launch(true);

    let err = match supervisor.start(false) {
        Err(DaemonError::Launch(err)) => err,
        other => panic!("expected launch error, got {:?}", other.map(|o| o.message)),
    };

    assert!(matches!(err, LaunchError::NoIdentifier { .. }));
    assert!(err
        .to_string()
        .contains(&supervisor.log_file().display().to_string()));
    assert!(!supervisor.pid_file().exists());
    assert_eq!(supervisor.pid().unwrap(), None);
}

#[test]
fn test_missing_lister_is_fatal_for_status() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    supervisor.start(false).unwrap();
    fixture.table.set_lister_available(false);

    assert!(matches!(
        supervisor.status(),
        Err(DaemonError::Environment(_))
    ));
    assert!(matches!(
        supervisor.start(false),
        Err(DaemonError::Environment(_))
    ));
}

#[test]
fn test_pid_is_read_lazily_from_file() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("web");
    assert_eq!(supervisor.pid().unwrap(), None);

    let external = fixture.table.spawn_external();
    fs::write(supervisor.pid_file(), format!("{}\n", external)).unwrap();

    assert_eq!(supervisor.pid().unwrap(), Some(external.clone()));
    assert!(supervisor.status().unwrap().state.is_running());
    assert_eq!(
        supervisor.pid().unwrap(),
        Some(ProcessId::parse(external.as_str()).unwrap())
    );
}
