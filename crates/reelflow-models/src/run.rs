//! Run identifiers and snapshots of tasks in the process table.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::JobRecord;

/// Unique identifier for a single task invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of a running task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSnapshot {
    /// Task name (process table key)
    pub name: String,
    /// Invocation ID
    pub run_id: RunId,
    /// OS process ID, if the process has not been reaped by the OS yet
    pub pid: Option<u32>,
    /// Per-task log file
    pub log_path: PathBuf,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Launch time
    pub started_at: DateTime<Utc>,
}

impl RunSnapshot {
    /// Command line joined with spaces, for display.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Everything the monitor page shows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MonitorView {
    pub running: Vec<RunSnapshot>,
    /// Newest first
    pub history: Vec<JobRecord>,
}

impl MonitorView {
    pub fn is_running(&self, name: &str) -> bool {
        self.running.iter().any(|r| r.name == name)
    }
}
