//! Task supervision core.
//!
//! This crate provides:
//! - Controller document loading (re-read on every request)
//! - Process launcher with per-task log files
//! - Process table and finished-job history owned by a single actor
//! - Reaper for exited processes
//! - Graceful-then-forced cancellation
//! - Log tailing as an async stream

pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod launcher;
pub mod logging;
pub mod metrics;
pub mod reaper;
pub mod streamer;
pub mod supervisor;
pub mod table;

mod cancel;

pub use catalog::TaskCatalog;
pub use config::SupervisorConfig;
pub use error::{CatalogError, CatalogResult, SupervisorError, SupervisorResult};
pub use history::JobHistory;
pub use streamer::{log_stream, LogSubscription};
pub use supervisor::{CancelOutcome, ClearReport, Supervisor, SupervisorHandle};
pub use table::{ProcessTable, RunHandle};
