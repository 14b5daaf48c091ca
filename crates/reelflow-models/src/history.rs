//! Finished-job history records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Marker placed at the top of a cancelled job's output.
pub const STOPPED_BY_USER: &str = "--- STOPPED BY USER ---";

/// A completed task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Task name
    pub name: String,
    /// Exit code was zero (always false for cancelled runs)
    pub success: bool,
    /// Captured combined stdout/stderr
    pub output: String,
    /// Exit code, when the process exited normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Run was stopped from the dashboard
    #[serde(default)]
    pub cancelled: bool,
    pub finished_at: DateTime<Utc>,
}

impl JobRecord {
    /// Record for a process that exited on its own.
    pub fn finished(name: impl Into<String>, exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: exit_code == Some(0),
            output: output.into(),
            exit_code,
            cancelled: false,
            finished_at: Utc::now(),
        }
    }

    /// Record for a cancelled run. Never successful, whatever the exit code.
    pub fn cancelled(name: impl Into<String>, exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: output.into(),
            exit_code,
            cancelled: true,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_success_follows_exit_code() {
        assert!(JobRecord::finished("Build", Some(0), "").success);
        assert!(!JobRecord::finished("Build", Some(1), "").success);
        // Killed by a signal: no exit code
        assert!(!JobRecord::finished("Build", None, "").success);
    }

    #[test]
    fn test_cancelled_is_never_successful() {
        let record = JobRecord::cancelled("Build", Some(0), "done");
        assert!(!record.success);
        assert!(record.cancelled);
        assert_eq!(record.exit_code, Some(0));
    }
}
