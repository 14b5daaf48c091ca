//! Supervisor configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Controller document holding the task descriptors
    pub catalog_path: PathBuf,
    /// Base directory for relative script paths
    pub project_root: PathBuf,
    /// Directory for per-task log files
    pub log_dir: PathBuf,
    /// Delay before checking whether a fresh process already exited
    pub launch_probe_delay: Duration,
    /// Pause between closing a finished task's log and reading it back
    pub reap_settle_delay: Duration,
    /// Log streamer poll interval
    pub stream_poll_interval: Duration,
    /// Time a cancelled task gets to exit before it is killed
    pub cancel_grace: Duration,
    /// Finished-job history capacity
    pub history_capacity: usize,
    /// Background reap period; `None` reaps only on requests
    pub reap_interval: Option<Duration>,
    /// Supervisor command channel size
    pub command_buffer: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("controller.json"),
            project_root: PathBuf::from("."),
            log_dir: PathBuf::from("running_logs"),
            launch_probe_delay: Duration::from_millis(200),
            reap_settle_delay: Duration::from_millis(500),
            stream_poll_interval: Duration::from_millis(100),
            cancel_grace: Duration::from_secs(5),
            history_capacity: 20,
            reap_interval: None,
            command_buffer: 64,
        }
    }
}

impl SupervisorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            catalog_path: std::env::var("CONTROLLER_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            project_root: std::env::var("PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.project_root),
            log_dir: std::env::var("TASK_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            launch_probe_delay: Duration::from_millis(
                std::env::var("LAUNCH_PROBE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            ),
            reap_settle_delay: Duration::from_millis(
                std::env::var("REAP_SETTLE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            stream_poll_interval: Duration::from_millis(
                std::env::var("STREAM_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            cancel_grace: Duration::from_secs(
                std::env::var("CANCEL_GRACE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            history_capacity: std::env::var("HISTORY_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(20),
            reap_interval: std::env::var("REAP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            command_buffer: std::env::var("SUPERVISOR_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(64),
        }
    }

    /// Config rooted at `dir`: controller file, project root and logs all live there.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            catalog_path: dir.join("controller.json"),
            log_dir: dir.join("running_logs"),
            project_root: dir,
            ..Self::default()
        }
    }
}
