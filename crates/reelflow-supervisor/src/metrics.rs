//! Task metrics.
//!
//! Recording is a no-op until the binary installs a recorder.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const TASKS_STARTED_TOTAL: &str = "reelflow_tasks_started_total";
    pub const TASKS_FAILED_TO_START_TOTAL: &str = "reelflow_tasks_failed_to_start_total";
    pub const TASKS_FINISHED_TOTAL: &str = "reelflow_tasks_finished_total";
    pub const TASKS_CANCELLED_TOTAL: &str = "reelflow_tasks_cancelled_total";
    pub const TASKS_RUNNING: &str = "reelflow_tasks_running";
    pub const LOG_STREAMS_ACTIVE: &str = "reelflow_log_streams_active";
}

pub fn record_task_started(task: &str) {
    counter!(names::TASKS_STARTED_TOTAL, "task" => task.to_string()).increment(1);
}

pub fn record_start_failure(task: &str) {
    counter!(names::TASKS_FAILED_TO_START_TOTAL, "task" => task.to_string()).increment(1);
}

pub fn record_task_finished(task: &str, success: bool) {
    counter!(
        names::TASKS_FINISHED_TOTAL,
        "task" => task.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

pub fn record_task_cancelled(task: &str, forced: bool) {
    counter!(
        names::TASKS_CANCELLED_TOTAL,
        "task" => task.to_string(),
        "forced" => forced.to_string()
    )
    .increment(1);
}

pub fn set_running_tasks(count: usize) {
    gauge!(names::TASKS_RUNNING).set(count as f64);
}

pub fn log_stream_opened() {
    gauge!(names::LOG_STREAMS_ACTIVE).increment(1.0);
}

pub fn log_stream_closed() {
    gauge!(names::LOG_STREAMS_ACTIVE).decrement(1.0);
}
