//! Stale lock cleanup.
//!
//! Link-based file locks leave two kinds of files in the lock directory:
//! - a sentinel `<hostname>-<anything>.<pid>` owned by the process holding the lock;
//! - the lock file `<prefix>-<name>.lock`, hard-linked to the sentinel while held.
//!
//! A process that dies while holding a lock leaves both behind and the next process blocks forever.
//! [`LockSweep::sweep`] removes sentinels whose pid no longer exists, then every lock file nobody links to.
//! Meant to run once at service startup, or periodically from a [`LoopingCall`](crate::LoopingCall).
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use regex::Regex;
use tracing::{debug, warn};

use crate::{error::CoreError, system};

pub const DEFAULT_LOCK_PATH: &str = "/var/lock";
pub const DEFAULT_LOCK_PREFIX: &str = "ops_sia";

/// Files removed by one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub sentinels: Vec<String>,
    pub lockfiles: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.sentinels.is_empty() && self.lockfiles.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LockSweep {
    lock_path: PathBuf,
    lock_prefix: String,
    hostname: String,
}

impl LockSweep {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            hostname: system::hostname().to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_prefix = prefix.into();
        self
    }

    /// Match sentinels of another host name (tests, shared lock dirs).
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    #[cfg(unix)]
    pub fn sweep(&self) -> Result<SweepReport, CoreError> {
        use std::os::unix::fs::MetadataExt;

        let sentinel_re = Regex::new(&format!(r"^{}-.*\.(\d+)$", regex::escape(&self.hostname)))?;
        let lockfile_re = Regex::new(&format!(r"^{}-.*\.lock", regex::escape(&self.lock_prefix)))?;
        let files = self.list_files()?;
        let mut report = SweepReport::default();

        for filename in &files {
            let Some(caps) = sentinel_re.captures(filename) else {
                continue;
            };
            let pid = &caps[1];
            debug!(file = %filename, pid, "found sentinel");

            // A pid too large for the platform cannot belong to a live process.
            let alive = pid.parse::<u32>().map(system::pid_alive).unwrap_or(false);
            if alive {
                continue;
            }
            delete_if_exists(&self.lock_path.join(filename))?;
            debug!(file = %filename, pid, "cleaned sentinel");
            report.sentinels.push(filename.clone());
        }

        for filename in &files {
            if !lockfile_re.is_match(filename) {
                continue;
            }
            let path = self.lock_path.join(filename);
            let links = match fs::metadata(&path) {
                Ok(meta) => meta.nlink(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(CoreError::Io { path, source }),
            };
            debug!(file = %filename, links, "found lockfile");

            if links == 1 {
                delete_if_exists(&path)?;
                debug!(file = %filename, links, "cleaned lockfile");
                report.lockfiles.push(filename.clone());
            }
        }
        Ok(report)
    }

    #[cfg(not(unix))]
    pub fn sweep(&self) -> Result<SweepReport, CoreError> {
        warn!(
            path = %self.lock_path.display(),
            "lock sweep relies on hard-link counts and kill(2); skipped on this platform"
        );
        Ok(SweepReport::default())
    }

    fn list_files(&self) -> Result<Vec<String>, CoreError> {
        let entries = fs::read_dir(&self.lock_path).map_err(|source| CoreError::LockDir {
            path: self.lock_path.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CoreError::LockDir {
                path: self.lock_path.clone(),
                source,
            })?;
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(raw) => warn!(file = ?raw, "skipping non utf-8 file name"),
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Remove a file, treating "already gone" as success.
pub fn delete_if_exists(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
