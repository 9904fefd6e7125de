//! `relay run`: one invocation against one backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use relay_core::{AgentRequest, AgentResult, AgentRunner, Outcome, ProgressSink};

/// Progress sink that prints status lines to stderr, keeping stdout for the
/// answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

#[async_trait]
impl ProgressSink for StderrSink {
    async fn notify(&self, status: &str) -> Result<()> {
        eprintln!("{status}");
        Ok(())
    }
}

/// Options for `relay run`, as parsed from the command line.
#[derive(Debug)]
pub struct RunOptions {
    pub backend: String,
    pub message: String,
    pub session: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tools: Vec<String>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the request and print its result. Returns `false` when the backend
/// failed or timed out.
pub async fn run_agent(runner: &AgentRunner, options: RunOptions) -> Result<bool> {
    let mut request =
        AgentRequest::new(options.backend, options.message).with_session(options.session);
    if let Some(secs) = options.timeout_secs {
        anyhow::ensure!(secs > 0, "--timeout must be positive");
        request = request.with_timeout(Duration::from_secs(secs));
    }
    if !options.tools.is_empty() {
        request = request.with_tools(options.tools);
    }
    if !options.quiet {
        request = request.with_progress(Arc::new(StderrSink));
    }

    let result = runner.run(&request).await?;
    print_result(&result, options.json)?;
    Ok(succeeded(&result))
}

/// Print a result to stdout: the text, then artifacts and the session id.
pub fn print_result(result: &AgentResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}", result.text);
    if !result.artifacts.is_empty() {
        println!();
        for path in &result.artifacts {
            println!("artifact: {}", path.display());
        }
    }
    if let Some(session_id) = &result.session_id {
        println!("session: {session_id}");
    }
    Ok(())
}

pub fn succeeded(result: &AgentResult) -> bool {
    !matches!(result.outcome, Outcome::Failed | Outcome::TimedOut)
}
