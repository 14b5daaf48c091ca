//! Supervising actor.
//!
//! A single task owns the process table and the finished-job history.
//! Handlers talk to it through [`SupervisorHandle`]; every command runs to
//! completion before the next one starts, so the "not running" check and the
//! insert of a trigger can never interleave with another trigger.

use std::path::PathBuf;

use reelflow_models::{MonitorView, RunSnapshot};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cancel::{cancel_many, cancel_run};
use crate::catalog::TaskCatalog;
use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::history::JobHistory;
use crate::launcher::{launch, log_path_for};
use crate::metrics;
use crate::reaper::reap_finished;
use crate::streamer::LogSubscription;
use crate::table::ProcessTable;

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The process was stopped; `forced` when it had to be killed
    Stopped { forced: bool },
    /// Nothing to stop: never started or already finished
    NotRunning,
}

/// Result of clearing the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Stray log files deleted from the log directory
    pub removed_files: usize,
    /// Per-file failures
    pub errors: Vec<String>,
}

enum Command {
    Trigger {
        name: String,
        reply: oneshot::Sender<SupervisorResult<RunSnapshot>>,
    },
    Monitor {
        reply: oneshot::Sender<MonitorView>,
    },
    Subscribe {
        name: String,
        reply: oneshot::Sender<Option<LogSubscription>>,
    },
    Cancel {
        name: String,
        reply: oneshot::Sender<CancelOutcome>,
    },
    ClearHistory {
        reply: oneshot::Sender<ClearReport>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Owner of the process table and history.
pub struct Supervisor {
    config: SupervisorConfig,
    catalog: TaskCatalog,
    table: ProcessTable,
    history: JobHistory,
    commands: mpsc::Receiver<Command>,
}

impl Supervisor {
    /// Start the supervisor on the current runtime.
    ///
    /// Table and history start empty; nothing survives a restart.
    pub fn spawn(config: SupervisorConfig) -> SupervisorHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let supervisor = Self {
            catalog: TaskCatalog::new(config.catalog_path.clone()),
            history: JobHistory::new(config.history_capacity),
            table: ProcessTable::new(),
            config,
            commands: rx,
        };

        tokio::spawn(supervisor.run());
        SupervisorHandle { tx }
    }

    async fn run(mut self) {
        info!(
            catalog = %self.config.catalog_path.display(),
            log_dir = %self.config.log_dir.display(),
            history_capacity = self.history.capacity(),
            "Supervisor started"
        );

        let mut reap_tick = self.config.reap_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle(command).await {
                                break;
                            }
                        }
                        None => {
                            debug!("All supervisor handles dropped");
                            self.cancel_all().await;
                            break;
                        }
                    }
                }
                _ = tick(&mut reap_tick) => {
                    self.reap().await;
                }
            }
        }

        info!("Supervisor stopped");
    }

    /// Run one command. Returns `false` once the supervisor should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Trigger { name, reply } => {
                let result = self.trigger(&name).await;
                let _ = reply.send(result);
            }
            Command::Monitor { reply } => {
                self.reap().await;
                let _ = reply.send(MonitorView {
                    running: self.table.snapshots(),
                    history: self.history.records(),
                });
            }
            Command::Subscribe { name, reply } => {
                let subscription = self.table.get(&name).map(|handle| {
                    LogSubscription::new(
                        name.clone(),
                        handle.log_path().to_path_buf(),
                        self.config.stream_poll_interval,
                        handle.subscribe(),
                    )
                });
                let _ = reply.send(subscription);
            }
            Command::Cancel { name, reply } => {
                let outcome = self.cancel(&name).await;
                let _ = reply.send(outcome);
            }
            Command::ClearHistory { reply } => {
                let report = self.clear_history().await;
                let _ = reply.send(report);
            }
            Command::Shutdown { reply } => {
                info!(running = self.table.len(), "Shutting down supervisor");
                self.cancel_all().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn reap(&mut self) -> usize {
        reap_finished(&mut self.table, &mut self.history, self.config.reap_settle_delay).await
    }

    async fn trigger(&mut self, name: &str) -> SupervisorResult<RunSnapshot> {
        self.reap().await;

        if self.table.contains(name) {
            warn!(task = %name, "Task is already running");
            return Err(SupervisorError::AlreadyRunning(name.to_string()));
        }

        let log_path = log_path_for(&self.config.log_dir, name);
        if self.table.log_path_in_use(&log_path) {
            return Err(SupervisorError::LogFileInUse {
                task: name.to_string(),
                path: log_path,
            });
        }

        let document = self.catalog.load().await?;
        let handle = match launch(name, &document, &self.config).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(task = %name, error = %e, "Failed to start task");
                metrics::record_start_failure(name);
                return Err(e);
            }
        };

        let snapshot = handle.snapshot();
        self.table.insert(handle);
        metrics::record_task_started(name);
        metrics::set_running_tasks(self.table.len());

        Ok(snapshot)
    }

    async fn cancel(&mut self, name: &str) -> CancelOutcome {
        let Some(handle) = self.table.get_mut(name) else {
            info!(task = %name, "Task not found or already finished");
            return CancelOutcome::NotRunning;
        };

        info!(task = %name, "Attempting to stop task");
        let (record, forced) = cancel_run(handle, self.config.cancel_grace).await;
        self.history.push(record);
        self.table.remove(name);

        metrics::record_task_cancelled(name, forced);
        metrics::set_running_tasks(self.table.len());
        CancelOutcome::Stopped { forced }
    }

    /// Stop every running task together, recording each in history.
    async fn cancel_all(&mut self) {
        let mut handles = self.table.drain();
        if handles.is_empty() {
            return;
        }

        info!(count = handles.len(), "Stopping all running tasks");
        let records = cancel_many(&mut handles, self.config.cancel_grace).await;
        for (record, forced) in records {
            metrics::record_task_cancelled(&record.name, forced);
            self.history.push(record);
        }
        metrics::set_running_tasks(self.table.len());
    }

    async fn clear_history(&mut self) -> ClearReport {
        self.history.clear();

        let mut report = ClearReport::default();
        let mut entries = match tokio::fs::read_dir(&self.config.log_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                report.errors.push(format!("Failed to scan log directory: {}", e));
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    report.errors.push(format!("Failed to scan log directory: {}", e));
                    break;
                }
            };

            let path: PathBuf = entry.path();
            if path.extension().map_or(true, |ext| ext != "log") {
                continue;
            }
            // Logs of running tasks are still being written and streamed
            if self.table.log_path_in_use(&path) {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.removed_files += 1,
                Err(e) => report.errors.push(format!(
                    "Could not remove {}: {}",
                    entry.file_name().to_string_lossy(),
                    e
                )),
            }
        }

        info!(
            removed = report.removed_files,
            errors = report.errors.len(),
            "Finished job log cleared"
        );
        report
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Cloneable handle to the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Command>,
}

impl SupervisorHandle {
    /// Reap, then start `name` unless it is already running.
    pub async fn trigger(&self, name: &str) -> SupervisorResult<RunSnapshot> {
        self.request(|reply| Command::Trigger {
            name: name.to_string(),
            reply,
        })
        .await?
    }

    /// Reap, then report running tasks and history.
    pub async fn monitor(&self) -> SupervisorResult<MonitorView> {
        self.request(|reply| Command::Monitor { reply }).await
    }

    /// Subscription for tailing a running task's log, `None` if not running.
    pub async fn subscribe(&self, name: &str) -> SupervisorResult<Option<LogSubscription>> {
        self.request(|reply| Command::Subscribe {
            name: name.to_string(),
            reply,
        })
        .await
    }

    /// Stop a running task. Not running is not an error.
    pub async fn cancel(&self, name: &str) -> SupervisorResult<CancelOutcome> {
        self.request(|reply| Command::Cancel {
            name: name.to_string(),
            reply,
        })
        .await
    }

    /// Empty the history and delete stray log files.
    pub async fn clear_history(&self) -> SupervisorResult<ClearReport> {
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    /// Stop every running task and the supervisor itself.
    pub async fn shutdown(&self) -> SupervisorResult<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Whether the supervisor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> SupervisorResult<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| SupervisorError::Unavailable)?;
        response.await.map_err(|_| SupervisorError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> SupervisorConfig {
        let mut config = SupervisorConfig::rooted_at(dir);
        config.launch_probe_delay = std::time::Duration::from_millis(10);
        config.reap_settle_delay = std::time::Duration::ZERO;
        config
    }

    #[tokio::test]
    async fn test_monitor_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::spawn(config(dir.path()));

        let view = supervisor.monitor().await.unwrap();
        assert!(view.running.is_empty());
        assert!(view.history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_controller_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::spawn(config(dir.path()));

        let err = supervisor.trigger("Build").await.unwrap_err();
        assert!(matches!(err, SupervisorError::Catalog(_)));
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::spawn(config(dir.path()));

        let outcome = supervisor.cancel("Build").await.unwrap();
        assert_eq!(outcome, CancelOutcome::NotRunning);
        assert!(supervisor.subscribe("Build").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_history_removes_stray_logs_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir_all(&config.log_dir).unwrap();
        std::fs::write(config.log_dir.join("Old_Task.log"), "leftover").unwrap();
        std::fs::write(config.log_dir.join("notes.txt"), "keep me").unwrap();

        let supervisor = Supervisor::spawn(config.clone());
        let report = supervisor.clear_history().await.unwrap();

        assert_eq!(report.removed_files, 1);
        assert!(report.errors.is_empty());
        assert!(!config.log_dir.join("Old_Task.log").exists());
        assert!(config.log_dir.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_clear_history_without_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::spawn(config(dir.path()));

        let report = supervisor.clear_history().await.unwrap();
        assert_eq!(report, ClearReport::default());
    }

    #[tokio::test]
    async fn test_handle_unavailable_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::spawn(config(dir.path()));

        supervisor.shutdown().await.unwrap();
        let err = supervisor.monitor().await.unwrap_err();
        assert!(matches!(err, SupervisorError::Unavailable));
    }
}
