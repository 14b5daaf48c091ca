//! Process table and run handles.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use chrono::{DateTime, Utc};
use reelflow_models::{RunId, RunSnapshot};
use tokio::process::Child;
use tokio::sync::watch;
use tracing::warn;

use crate::logging::TaskLogger;

/// Live record of one task's in-flight process and its log artifacts.
///
/// The handle is the sole owner of the log writer; the child only holds
/// duplicated descriptors. Dropping the handle closes the writer and the
/// liveness channel, which tells log streamers the task has left the table.
#[derive(Debug)]
pub struct RunHandle {
    name: String,
    run_id: RunId,
    child: Child,
    pid: Option<u32>,
    log_path: PathBuf,
    log_writer: Option<File>,
    command: Vec<String>,
    started_at: DateTime<Utc>,
    alive: watch::Sender<bool>,
    logger: TaskLogger,
}

impl RunHandle {
    pub(crate) fn new(
        name: impl Into<String>,
        run_id: RunId,
        child: Child,
        log_path: PathBuf,
        log_writer: File,
        command: Vec<String>,
    ) -> Self {
        let name = name.into();
        let pid = child.id();
        let logger = TaskLogger::new(&name, &run_id);
        let (alive, _) = watch::channel(true);

        Self {
            name,
            run_id,
            child,
            pid,
            log_path,
            log_writer: Some(log_writer),
            command,
            started_at: Utc::now(),
            alive,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn logger(&self) -> &TaskLogger {
        &self.logger
    }

    pub(crate) fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Non-blocking exit check.
    pub fn try_exit_status(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Close the log writer. Safe to call more than once.
    pub fn close_log(&mut self) {
        if let Some(writer) = self.log_writer.take() {
            if let Err(e) = writer.sync_all() {
                warn!(task = %self.name, error = %e, "Error closing log handle");
            }
        }
    }

    /// Liveness receiver for log streamers.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.alive.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            name: self.name.clone(),
            run_id: self.run_id.clone(),
            pid: self.pid,
            log_path: self.log_path.clone(),
            command: self.command.clone(),
            started_at: self.started_at,
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.close_log();
        self.alive.send_replace(false);
    }
}

/// Mapping from task name to its run handle.
///
/// A name appears at most once. An entry means "believed running": the
/// process may already have exited and be waiting for the next reap.
#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: BTreeMap<String, RunHandle>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle, returning any handle it displaced.
    ///
    /// Callers check [`ProcessTable::contains`] first; the supervisor does
    /// both in the same turn so a displaced handle never occurs there.
    pub fn insert(&mut self, handle: RunHandle) -> Option<RunHandle> {
        self.entries.insert(handle.name.clone(), handle)
    }

    /// Remove an entry. No-op when absent.
    pub fn remove(&mut self, name: &str) -> Option<RunHandle> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RunHandle> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RunHandle> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove every entry, in name order.
    pub fn drain(&mut self) -> Vec<RunHandle> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a running entry already writes to `path`.
    pub fn log_path_in_use(&self, path: &Path) -> bool {
        self.entries.values().any(|h| h.log_path == path)
    }

    pub fn snapshots(&self) -> Vec<RunSnapshot> {
        self.entries.values().map(RunHandle::snapshot).collect()
    }
}
