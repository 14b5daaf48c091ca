//! Supervisor error types.

use std::path::PathBuf;

use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors loading the controller document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Controller file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid JSON in controller file {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not read controller file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write controller file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode controller document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors starting or managing a task.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Task '{0}' not found in controller tasks")]
    TaskNotFound(String),

    #[error("'script' path missing for task '{0}'")]
    ScriptPathMissing(String),

    #[error("Script file not found: {0}")]
    ScriptNotFound(PathBuf),

    #[error("Interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Task '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Log file {path} is in use by another running task (requested '{task}')")]
    LogFileInUse { task: String, path: PathBuf },

    #[error("Could not open log file {path}: {source}")]
    LogFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start process for task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Supervisor is not running")]
    Unavailable,
}

impl SupervisorError {
    pub fn spawn(task: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            task: task.into(),
            source,
        }
    }

    /// Descriptor problems: the task was never launched and nothing was left behind.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SupervisorError::TaskNotFound(_)
                | SupervisorError::ScriptPathMissing(_)
                | SupervisorError::ScriptNotFound(_)
        )
    }

    /// The request clashed with a task that is still running.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SupervisorError::AlreadyRunning(_) | SupervisorError::LogFileInUse { .. }
        )
    }
}
