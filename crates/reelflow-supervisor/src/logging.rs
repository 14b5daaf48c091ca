//! Structured task logging utilities.
//!
//! Provides consistent, structured logging for task lifecycle events.

use reelflow_models::RunId;
use tracing::{error, info, warn};

/// Task logger for structured logging with consistent formatting.
///
/// Every event carries the task name and the invocation ID so runs of the
/// same task can be told apart in the server log.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task: String,
    run_id: String,
}

impl TaskLogger {
    /// Create a new logger for a task invocation.
    pub fn new(task: &str, run_id: &RunId) -> Self {
        Self {
            task: task.to_string(),
            run_id: run_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(task = %self.task, run_id = %self.run_id, "Task started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(task = %self.task, run_id = %self.run_id, "Task progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(task = %self.task, run_id = %self.run_id, "Task warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(task = %self.task, run_id = %self.run_id, "Task error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(task = %self.task, run_id = %self.run_id, "Task completed: {}", message);
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_logger_creation() {
        let run_id = RunId::new();
        let logger = TaskLogger::new("Build", &run_id);

        assert_eq!(logger.task(), "Build");
        assert_eq!(logger.run_id(), run_id.as_str());
    }
}
