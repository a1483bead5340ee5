use crate::error::{ExtMgrError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// File name of the lock that keeps concurrent `update`/`check` commands apart.
pub const LOCK_FILE_NAME: &str = "pvtextmgr.lock";

/// Cooperative cancellation flag, checked by the controller between extensions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Hands out at most one `TaskState` at a time.
///
/// With a lock file the guard also holds across processes: the file is created
/// exclusively when a run starts and removed when its `TaskState` is dropped.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    active: Arc<AtomicBool>,
    lock_file: Option<PathBuf>,
}

impl TaskRegistry {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_file(path: impl Into<PathBuf>) -> Self {
        Self {
            active: Arc::default(),
            lock_file: Some(path.into()),
        }
    }

    /// Starts a run over `total` extensions, or fails if one is already in progress.
    pub fn start(&self, total: usize, cancel: CancellationToken) -> Result<TaskState> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ExtMgrError::RunInProgress)?;

        let lock = match &self.lock_file {
            Some(path) => match acquire_lock(path) {
                Ok(()) => Some(path.clone()),
                Err(e) => {
                    self.active.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(TaskState {
            active: self.active.clone(),
            lock,
            current: 0,
            total,
            any_updated: false,
            cancel,
        })
    }

    #[cfg(test)]
    pub fn is_in_progress(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

fn acquire_lock(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!(
                lock = %path.display(),
                "lock file exists; remove it if no other run is active"
            );
            return Err(ExtMgrError::RunInProgress);
        }
        Err(e) => return Err(e.into()),
    };

    // Holder's pid, for spotting a stale lock.
    if let Err(e) = writeln!(file, "{}", process::id()) {
        warn!(lock = %path.display(), error = %e, "could not write pid to lock file");
    }
    Ok(())
}

/// State of the single in-flight batch run. Dropping it ends the run.
#[derive(Debug)]
pub struct TaskState {
    active: Arc<AtomicBool>,
    lock: Option<PathBuf>,
    pub current: usize,
    pub total: usize,
    pub any_updated: bool,
    cancel: CancellationToken,
}

impl TaskState {
    pub fn cancellation_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Moves on to the next extension and returns its 1-based position.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1).min(self.total);
        self.current
    }
}

impl Drop for TaskState {
    fn drop(&mut self) {
        if let Some(path) = &self.lock {
            if let Err(e) = fs::remove_file(path) {
                warn!(lock = %path.display(), error = %e, "could not remove lock file");
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }
}
