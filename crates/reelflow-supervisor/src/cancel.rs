//! Graceful-then-forced cancellation of a running task.
//!
//! Every task runs as the leader of its own process group, so stop signals
//! reach the whole tree the script started, not just the script itself.

use std::io::ErrorKind;
use std::time::Duration;

use futures_util::future::join_all;
use reelflow_models::history::STOPPED_BY_USER;
use reelflow_models::JobRecord;
use tracing::warn;

use crate::reaper::{read_log, remove_log_file};
use crate::table::RunHandle;

/// How the process ended.
#[derive(Debug)]
pub(crate) struct StopOutcome {
    pub forced: bool,
    pub exit_code: Option<i32>,
    /// Diagnostics placed under the stop marker
    pub notes: String,
}

/// Send the terminate request to the task's process group.
///
/// Returns the notes collected so far.
pub(crate) fn request_stop(handle: &mut RunHandle) -> String {
    let mut notes = String::new();
    match signal::terminate(handle) {
        Ok(()) => handle.logger().log_progress("terminate requested"),
        Err(e) => {
            warn!(task = %handle.name(), error = %e, "Terminate request failed");
            notes.push_str(&format!("--- Error during stop: {} ---\n", e));
        }
    }
    notes
}

/// Wait up to `grace` for the process to exit, then kill its group.
pub(crate) async fn await_exit(handle: &mut RunHandle, grace: Duration, mut notes: String) -> StopOutcome {
    let name = handle.name().to_string();

    let outcome = match tokio::time::timeout(grace, handle.child_mut().wait()).await {
        Ok(Ok(status)) => StopOutcome {
            forced: false,
            exit_code: status.code(),
            notes,
        },
        Ok(Err(e)) => {
            warn!(task = %name, error = %e, "Error waiting for process");
            notes.push_str(&format!("--- Error during stop: {} ---\n", e));
            StopOutcome {
                forced: false,
                exit_code: None,
                notes,
            }
        }
        Err(_) => {
            warn!(task = %name, grace_secs = grace.as_secs_f64(), "Process unresponsive, killing");
            notes.push_str("--- Process unresponsive, had to kill. ---\n");
            let exit_code = match signal::kill(handle).await {
                Ok(status) => status.and_then(|s| s.code()),
                Err(e) => {
                    warn!(task = %name, error = %e, "Kill failed");
                    notes.push_str(&format!("--- Error during stop: {} ---\n", e));
                    None
                }
            };
            StopOutcome {
                forced: true,
                exit_code,
                notes,
            }
        }
    };

    // The leader is gone; anything left in its group is an orphan.
    if let Err(e) = signal::sweep_group(handle) {
        warn!(task = %name, error = %e, "Could not kill leftover processes");
    }

    outcome
}

/// Close the log and turn the run's output into a cancelled record.
///
/// The caller removes the entry from the table afterwards.
pub(crate) async fn harvest(handle: &mut RunHandle, outcome: StopOutcome) -> (JobRecord, bool) {
    handle.close_log();

    let log_path = handle.log_path().to_path_buf();
    let output = match read_log(&log_path).await {
        Ok(content) => {
            remove_log_file(&log_path).await;
            format!("{}\n{}{}", STOPPED_BY_USER, outcome.notes, content)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => format!(
            "--- STOPPED BY USER (Log file '{}' not found) ---\n{}",
            log_path.display(),
            outcome.notes
        ),
        Err(e) => {
            remove_log_file(&log_path).await;
            format!(
                "--- STOPPED BY USER (Error reading/removing log): {} ---\n{}",
                e, outcome.notes
            )
        }
    };

    handle.logger().log_completion(if outcome.forced {
        "stopped by user (killed)"
    } else {
        "stopped by user"
    });

    (
        JobRecord::cancelled(handle.name(), outcome.exit_code, output),
        outcome.forced,
    )
}

/// Stop one task and harvest its output.
pub(crate) async fn cancel_run(handle: &mut RunHandle, grace: Duration) -> (JobRecord, bool) {
    let notes = request_stop(handle);
    let outcome = await_exit(handle, grace, notes).await;
    harvest(handle, outcome).await
}

/// Stop several tasks at once.
///
/// All terminate requests go out before any wait starts, so the whole batch
/// takes at most one grace period. Records come back in `handles` order.
pub(crate) async fn cancel_many(handles: &mut [RunHandle], grace: Duration) -> Vec<(JobRecord, bool)> {
    let notes: Vec<String> = handles.iter_mut().map(request_stop).collect();

    let outcomes = join_all(
        handles
            .iter_mut()
            .zip(notes)
            .map(|(handle, notes)| await_exit(handle, grace, notes)),
    )
    .await;

    let mut records = Vec::with_capacity(handles.len());
    for (handle, outcome) in handles.iter_mut().zip(outcomes) {
        records.push(harvest(handle, outcome).await);
    }
    records
}

#[cfg(unix)]
mod signal {
    use std::process::ExitStatus;

    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    use crate::table::RunHandle;

    /// Signal the group led by the task's process. A group that no longer
    /// exists is not an error.
    fn signal_group(handle: &RunHandle, signal: Signal) -> std::io::Result<()> {
        let Some(pid) = handle.pid() else {
            return Ok(());
        };
        let pgid = i32::try_from(pid)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;

        match killpg(Pid::from_raw(pgid), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn terminate(handle: &mut RunHandle) -> std::io::Result<()> {
        signal_group(handle, Signal::SIGTERM)
    }

    pub(super) async fn kill(handle: &mut RunHandle) -> std::io::Result<Option<ExitStatus>> {
        signal_group(handle, Signal::SIGKILL)?;
        handle.child_mut().wait().await.map(Some)
    }

    pub(super) fn sweep_group(handle: &RunHandle) -> std::io::Result<()> {
        signal_group(handle, Signal::SIGKILL)
    }
}

#[cfg(not(unix))]
mod signal {
    use std::process::ExitStatus;

    use crate::table::RunHandle;

    pub(super) fn terminate(handle: &mut RunHandle) -> std::io::Result<()> {
        handle.child_mut().start_kill()
    }

    pub(super) async fn kill(handle: &mut RunHandle) -> std::io::Result<Option<ExitStatus>> {
        let child = handle.child_mut();
        child.kill().await?;
        Ok(child.try_wait()?)
    }

    pub(super) fn sweep_group(_handle: &RunHandle) -> std::io::Result<()> {
        Ok(())
    }
}
