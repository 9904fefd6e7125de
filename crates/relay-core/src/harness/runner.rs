//! Drives one backend invocation from spawn to [`AgentResult`].
//!
//! The runner owns everything the backends have in common: launching the
//! process, reading stdout line by line, feeding the decoder, throttling
//! progress, enforcing the deadline, and scanning for artifacts once the
//! process has exited cleanly.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::aggregate::Collector;
use super::launcher::{LINE_BUFFER_BYTES, LaunchSpec, LaunchedProcess, launch};
use super::registry::HarnessRegistry;
use super::trait_def::{Harness, Invocation};
use super::types::{AgentRequest, AgentResult};
use crate::artifacts::scan_artifacts;
use crate::config::RelayConfig;
use crate::progress::{ProgressState, deliver};

/// How long to wait for the stderr drain after the process has exited.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Failures that prevent an invocation from producing a result at all.
///
/// Everything that happens after a successful spawn (non-zero exit,
/// timeout, garbage output) is reported through [`AgentResult::text`]
/// instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown backend {0:?} (available: {1})")]
    UnknownBackend(String, String),

    #[error("failed to launch {binary}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("backend process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("failed to wait for backend process")]
    Wait(#[source] io::Error),
}

/// Run `request` against `harness`.
pub async fn run_harness(
    harness: &dyn Harness,
    request: &AgentRequest,
    config: &RelayConfig,
) -> Result<AgentResult, RunError> {
    let backend = harness.name();
    let timeout = request.timeout.unwrap_or(config.default_timeout);
    let allowed_tools = request
        .allowed_tools
        .as_deref()
        .unwrap_or_else(|| harness.default_tools());
    let invocation = Invocation {
        message: &request.message,
        session_id: request.session_id.as_deref(),
        allowed_tools,
    };
    let spec = LaunchSpec {
        binary: harness.binary().to_owned(),
        args: harness.build_args(&invocation),
        working_dir: config.working_dir.clone(),
        env_remove: harness.env_remove(),
    };

    let LaunchedProcess {
        mut child,
        stdout,
        stderr,
    } = launch(&spec)?;
    info!(
        backend,
        pid = child.id(),
        resumed = request.session_id.is_some(),
        timeout_secs = timeout.as_secs(),
        "backend started"
    );

    let stderr_task = tokio::spawn(drain_stderr(stderr));

    let mut decoder = harness.decoder();
    let mut collector = Collector::new(request.session_id.clone());
    let mut progress = ProgressState::new();
    let sink = request.progress.as_deref();

    let streamed = tokio::time::timeout(timeout, async {
        let mut lines = BufReader::with_capacity(LINE_BUFFER_BYTES, stdout).split(b'\n');
        loop {
            match lines.next_segment().await {
                Ok(Some(raw)) => {
                    let line = String::from_utf8_lossy(&raw);
                    collector.record_line(&line);
                    for event in decoder.decode_line(&line) {
                        if let (Some(sink), Some(status)) =
                            (sink, progress.observe(&event, Instant::now()))
                        {
                            deliver(sink, &status).await;
                        }
                        collector.apply(event);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(backend, error = %e, "failed reading backend stdout");
                    break;
                }
            }
        }
        child.wait().await
    })
    .await;

    let status = match streamed {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            stderr_task.abort();
            return Err(RunError::Wait(e));
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(backend, error = %e, "failed to kill timed-out backend");
            }
            stderr_task.abort();
            warn!(backend, timeout_secs = timeout.as_secs(), "backend timed out and was killed");
            return Ok(AgentResult::timed_out(
                timeout,
                collector.into_session_id(),
            ));
        }
    };

    let stderr_text = collect_stderr(stderr_task).await;

    if !status.success() {
        warn!(
            backend,
            code = ?status.code(),
            stderr = %stderr_text.trim(),
            "backend exited with an error"
        );
        return Ok(collector.into_failed());
    }
    if !stderr_text.trim().is_empty() {
        debug!(backend, stderr = %stderr_text.trim(), "backend stderr");
    }

    let artifacts = scan_artifacts(&collector.transcript());
    let result = collector.finish(artifacts);
    info!(
        backend,
        outcome = ?result.outcome,
        session_id = ?result.session_id,
        artifacts = result.artifacts.len(),
        tool_calls = progress.tool_calls(),
        "backend finished"
    );
    Ok(result)
}

async fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut buf).await {
        debug!(error = %e, "failed reading backend stderr");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// stderr may be held open by a grandchild, so the drain is only awaited for
/// a short grace period.
async fn collect_stderr(task: JoinHandle<String>) -> String {
    match tokio::time::timeout(STDERR_GRACE, task).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            debug!(error = %e, "stderr drain task failed");
            String::new()
        }
        Err(_) => String::new(),
    }
}

/// Entry point for running requests against registered backends.
#[derive(Debug)]
pub struct AgentRunner {
    registry: HarnessRegistry,
    config: RelayConfig,
}

impl AgentRunner {
    /// A runner with the three built-in backends configured from `config`.
    pub fn new(config: RelayConfig) -> Self {
        let registry = HarnessRegistry::with_defaults(&config);
        Self { registry, config }
    }

    pub fn with_registry(config: RelayConfig, registry: HarnessRegistry) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &HarnessRegistry {
        &self.registry
    }

    /// Run one request. Only lookup and spawn failures are errors; every
    /// other outcome is described by the returned result.
    pub async fn run(&self, request: &AgentRequest) -> Result<AgentResult, RunError> {
        let harness = self.registry.get(&request.backend).ok_or_else(|| {
            RunError::UnknownBackend(request.backend.clone(), self.registry.list().join(", "))
        })?;
        run_harness(harness, request, &self.config).await
    }
}
