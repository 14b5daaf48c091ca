//! Reaper for exited processes.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use reelflow_models::JobRecord;
use tracing::{info, warn};

use crate::history::JobHistory;
use crate::launcher::file_label;
use crate::metrics;
use crate::table::ProcessTable;

/// Harvest every table entry whose process has exited.
///
/// For each exited entry: close the log writer, wait `settle`, read the log
/// as the captured output, push a history record, delete the log file and
/// finally drop the entry. Failures on one entry are logged and never stop
/// the pass. Returns the number of entries reaped.
pub async fn reap_finished(
    table: &mut ProcessTable,
    history: &mut JobHistory,
    settle: Duration,
) -> usize {
    let mut reaped = 0;

    for name in table.names() {
        let Some(handle) = table.get_mut(&name) else {
            continue;
        };

        let status = match handle.try_exit_status() {
            Ok(Some(status)) => status,
            Ok(None) => continue,
            Err(e) => {
                warn!(task = %name, error = %e, "Could not poll process, skipping");
                continue;
            }
        };

        info!(task = %name, code = ?status.code(), "Process finished");
        handle.close_log();
        let log_path = handle.log_path().to_path_buf();

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        let output = captured_output(&log_path).await;

        let record = JobRecord::finished(name.clone(), status.code(), output);
        metrics::record_task_finished(&name, record.success);
        handle.logger().log_completion(&format!(
            "exit {}, success {}",
            status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".into()),
            record.success
        ));
        history.push(record);

        remove_log_file(&log_path).await;
        table.remove(&name);
        reaped += 1;
    }

    if reaped > 0 {
        metrics::set_running_tasks(table.len());
    }
    reaped
}

/// Read a whole log file, replacing invalid UTF-8.
pub(crate) async fn read_log(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Log contents, or a placeholder explaining why there are none.
pub(crate) async fn captured_output(path: &Path) -> String {
    match read_log(path).await {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => "Log file not found.".to_string(),
        Err(e) => format!("Error reading log file: {}", e),
    }
}

/// Best-effort log deletion.
pub(crate) async fn remove_log_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            info!(file = %file_label(path), "Could not remove log file (locked)");
        }
        Err(e) => warn!(file = %file_label(path), error = %e, "Error removing log file"),
    }
}
