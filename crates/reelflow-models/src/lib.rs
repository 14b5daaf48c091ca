//! Shared data models for the ReelFlow task controller.
//!
//! This crate provides Serde-serializable types for:
//! - The controller document (task descriptors, categories, settings)
//! - Run snapshots for tasks currently in the process table
//! - Finished-job history records
//! - Log stream messages

pub mod history;
pub mod run;
pub mod stream;
pub mod task;

// Re-export common types
pub use history::JobRecord;
pub use run::{MonitorView, RunId, RunSnapshot};
pub use stream::StreamMessage;
pub use task::{ControllerDocument, DashboardModule, TaskDescriptor, CATEGORY_FLAG, CONTROLLER_FLAG};
