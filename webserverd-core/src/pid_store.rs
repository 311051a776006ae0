//! PID file persistence
//!
//! The PID file is the single source of truth for which process, if any,
//! belongs to a uid. Contents are the trimmed identifier with no trailing
//! structure. There is no locking: one active writer per uid is assumed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::ProcessId;

/// Reads, writes and removes one PID file
#[derive(Debug, Clone)]
pub struct PidStore {
    path: PathBuf,
}

impl PidStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored identifier
    ///
    /// Returns `Ok(None)` when the file is missing or its trimmed contents
    /// are empty. The identifier format is not validated.
    pub fn read(&self) -> io::Result<Option<ProcessId>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(ProcessId::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist `pid`, replacing any previous contents
    ///
    /// Writes a sibling temporary file and renames it over the target so
    /// readers never observe a half-written identifier.
    pub fn write(&self, pid: &ProcessId) -> io::Result<()> {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, pid.as_str())?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        debug!(pid = %pid, path = %self.path.display(), "wrote PID file");
        Ok(())
    }

    /// Remove the PID file
    ///
    /// Best effort: a missing file is not an error and other failures are
    /// only logged.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed PID file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove PID file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = PidStore::new(dir.path().join("absent.pid"));
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_write_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let store = PidStore::new(dir.path().join("web.pid"));
        store.write(&ProcessId::parse("77").unwrap()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "77");
    }

    #[test]
    fn test_remove_twice_is_harmless() {
        let dir = tempdir().unwrap();
        let store = PidStore::new(dir.path().join("web.pid"));
        store.write(&ProcessId::parse("77").unwrap()).unwrap();

        store.remove();
        store.remove();
        assert!(!store.path().exists());
    }
}
