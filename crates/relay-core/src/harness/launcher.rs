//! Child-process launch for backend CLIs.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use super::runner::RunError;

/// Read buffer for backend stdout. Lines longer than this are still read in
/// full; the buffer only sizes the common case of large JSON events.
pub const LINE_BUFFER_BYTES: usize = 2 * 1024 * 1024;

/// Everything needed to start one backend process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub binary: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Inherited variables to strip from the child's environment.
    pub env_remove: Vec<String>,
}

/// A running backend with its output pipes taken.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawn the process described by `spec`.
///
/// stdin is closed, stdout and stderr are piped, and the child is killed if
/// the returned handle is dropped before it exits.
pub fn launch(spec: &LaunchSpec) -> Result<LaunchedProcess, RunError> {
    let mut cmd = Command::new(&spec.binary);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for var in &spec.env_remove {
        cmd.env_remove(var);
    }

    debug!(binary = %spec.binary, args = ?spec.args, cwd = %spec.working_dir.display(), "spawning backend");

    let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
        binary: spec.binary.clone(),
        source,
    })?;
    let stdout = child.stdout.take().ok_or(RunError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(RunError::MissingPipe("stderr"))?;

    Ok(LaunchedProcess {
        child,
        stdout,
        stderr,
    })
}
