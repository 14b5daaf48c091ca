//! Process launcher.
//!
//! Resolves a task descriptor into a command line, opens the task's log file
//! and spawns the process with stdout and stderr redirected into it.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use reelflow_models::{ControllerDocument, RunId, TaskDescriptor, CATEGORY_FLAG, CONTROLLER_FLAG};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::logging::TaskLogger;
use crate::table::RunHandle;

/// Resolved command for one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Interpreter or script to execute
    pub program: String,
    /// Arguments after the program
    pub args: Vec<String>,
    /// Directory the process runs in (the script's directory)
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Build the invocation for `descriptor`, whose script resolved to `script`.
    ///
    /// With an interpreter the script is passed by file name, relative to the
    /// working directory. The controller flag pair is appended only for
    /// category-driven tasks.
    pub fn build(descriptor: &TaskDescriptor, script: &Path, controller_path: &Path) -> Self {
        let working_dir = match script.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (program, mut args) = match &descriptor.interpreter {
            Some(interpreter) => {
                let file_name = script
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| script.to_string_lossy().into_owned());
                let mut args = descriptor.interpreter_args.clone();
                args.push(file_name);
                (interpreter.clone(), args)
            }
            None => (script.to_string_lossy().into_owned(), Vec::new()),
        };

        args.extend(descriptor.args.iter().cloned());
        if descriptor.needs_controller_arg() {
            args.push(CONTROLLER_FLAG.to_string());
            args.push(controller_path.to_string_lossy().into_owned());
        }

        Self {
            program,
            args,
            working_dir,
        }
    }

    /// Program followed by its arguments.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_task_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Log file used by a task.
pub fn log_path_for(log_dir: &Path, task_name: &str) -> PathBuf {
    log_dir.join(format!("{}.log", sanitize_task_name(task_name)))
}

/// Resolve a script path against the project root.
pub fn resolve_script(project_root: &Path, script: &str) -> PathBuf {
    absolutize(&project_root.join(script))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Start `name` from the given controller document.
///
/// Descriptor problems are reported before anything touches the log
/// directory. A spawn failure closes and deletes the fresh log file. A
/// process that exits during the launch probe is only logged: the caller
/// still gets its handle and the reaper records the result.
pub async fn launch(
    name: &str,
    document: &ControllerDocument,
    config: &SupervisorConfig,
) -> SupervisorResult<RunHandle> {
    let descriptor = document
        .task(name)
        .ok_or_else(|| SupervisorError::TaskNotFound(name.to_string()))?;

    let script = descriptor
        .script_path()
        .ok_or_else(|| SupervisorError::ScriptPathMissing(name.to_string()))?;

    let script_path = resolve_script(&config.project_root, script);
    if !tokio::fs::try_exists(&script_path).await.unwrap_or(false) {
        return Err(SupervisorError::ScriptNotFound(script_path));
    }

    let controller_path = absolutize(&config.catalog_path);
    let mut invocation = Invocation::build(descriptor, &script_path, &controller_path);

    let program = match &descriptor.interpreter {
        Some(interpreter) => which::which(interpreter)
            .map_err(|_| SupervisorError::InterpreterNotFound(interpreter.clone()))?,
        None => script_path.clone(),
    };
    invocation.program = program.to_string_lossy().into_owned();

    let run_id = RunId::new();
    let logger = TaskLogger::new(name, &run_id);
    debug!(
        task = %name,
        category = descriptor.arg_value(CATEGORY_FLAG).unwrap_or("-"),
        command = ?invocation.command_line(),
        "Final command"
    );

    let log_path = log_path_for(&config.log_dir, name);
    let log_writer = open_log_file(&config.log_dir, &log_path).await?;

    let child = match spawn_child(&program, &invocation, &log_writer) {
        Ok(child) => child,
        Err(e) => {
            logger.log_error(&format!("spawn failed: {}", e));
            drop(log_writer);
            discard_log_file(&log_path).await;
            return Err(SupervisorError::spawn(name, e));
        }
    };

    let mut handle = RunHandle::new(
        name,
        run_id,
        child,
        log_path,
        log_writer,
        invocation.command_line(),
    );
    logger.log_start(&format!(
        "pid {}, log {}",
        handle.pid().map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
        handle.log_path().display()
    ));

    tokio::time::sleep(config.launch_probe_delay).await;
    match handle.try_exit_status() {
        Ok(Some(status)) => logger.log_warning(&format!(
            "Process exited immediately: {}. Check log '{}'",
            status,
            file_label(handle.log_path())
        )),
        Ok(None) => {}
        Err(e) => warn!(task = %name, error = %e, "Launch probe failed"),
    }

    Ok(handle)
}

async fn open_log_file(log_dir: &Path, log_path: &Path) -> SupervisorResult<File> {
    tokio::fs::create_dir_all(log_dir)
        .await
        .map_err(|e| SupervisorError::LogFileOpen {
            path: log_dir.to_path_buf(),
            source: e,
        })?;

    let file = tokio::fs::File::create(log_path)
        .await
        .map_err(|e| SupervisorError::LogFileOpen {
            path: log_path.to_path_buf(),
            source: e,
        })?;

    Ok(file.into_std().await)
}

fn spawn_child(program: &Path, invocation: &Invocation, log: &File) -> std::io::Result<Child> {
    let stdout = log.try_clone()?;
    let stderr = log.try_clone()?;

    let mut command = Command::new(program);
    command
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    // Own process group, so a stop reaches everything the script starts.
    #[cfg(unix)]
    command.process_group(0);

    command.spawn()
}

async fn discard_log_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove log file of failed launch");
        }
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
