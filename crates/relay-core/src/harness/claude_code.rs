//! Claude Code harness adapter.
//!
//! Spawns `claude -p <message> --output-format stream-json --verbose` and
//! decodes its JSONL output into [`StreamEvent`] variants.

use serde_json::Value;
use tracing::debug;

use super::trait_def::{Harness, Invocation, StreamDecoder, non_empty_str};
use super::types::{DelegatedOutput, StreamEvent};
use crate::config::RelayConfig;

/// Tool names Claude Code uses to hand work to a sub-agent.
const DELEGATION_TOOLS: [&str; 2] = ["Task", "Agent"];

/// Harness adapter for [Claude Code](https://docs.anthropic.com/en/docs/claude-code).
#[derive(Debug, Clone)]
pub struct ClaudeCodeAdapter {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    claude_binary_path: String,
    default_tools: Vec<String>,
    /// Set by Claude Code inside its own sessions; stripped before spawning.
    nested_session_var: String,
}

impl ClaudeCodeAdapter {
    /// Create a new adapter that will look for `claude` on `$PATH`.
    pub fn new() -> Self {
        Self::from_config(&RelayConfig::new("."))
    }

    /// Create a new adapter with a custom binary path.
    ///
    /// Useful for testing or when `claude` is installed in a non-standard
    /// location.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            claude_binary_path: path.into(),
            ..Self::new()
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            claude_binary_path: config.claude_binary.clone(),
            default_tools: config.claude_tools.clone(),
            nested_session_var: config.nested_session_var.clone(),
        }
    }
}

impl Default for ClaudeCodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness for ClaudeCodeAdapter {
    fn name(&self) -> &str {
        "claude"
    }

    fn binary(&self) -> &str {
        &self.claude_binary_path
    }

    fn default_tools(&self) -> &[String] {
        &self.default_tools
    }

    fn build_args(&self, invocation: &Invocation<'_>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(session_id) = invocation.session_id {
            args.push("--resume".to_string());
            args.push(session_id.to_string());
        }
        args.extend(
            [
                "-p",
                invocation.message,
                "--output-format",
                "stream-json",
                "--verbose",
            ]
            .map(str::to_string),
        );
        // No tools means no flag at all, never a bare `--allowedTools`.
        if !invocation.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.extend(invocation.allowed_tools.iter().cloned());
        }
        args
    }

    fn env_remove(&self) -> Vec<String> {
        vec![self.nested_session_var.clone()]
    }

    fn decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(ClaudeDecoder::default())
    }
}

// ---------------------------------------------------------------------------
// stream-json decoding
// ---------------------------------------------------------------------------

/// Decoder for Claude Code's stream-json output.
///
/// Tracks the most recent sub-agent delegation so the next tool result can
/// be attributed to it. Attribution assumes each delegation's result arrives
/// before the next delegation starts.
#[derive(Debug, Default)]
pub struct ClaudeDecoder {
    pending_delegate: Option<String>,
}

impl ClaudeDecoder {
    /// The delegate whose result is awaited, if any.
    pub fn pending_delegate(&self) -> Option<&str> {
        self.pending_delegate.as_deref()
    }

    fn tool_invoked(&mut self, block: &Value, events: &mut Vec<StreamEvent>) {
        let tool = block
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string();
        if DELEGATION_TOOLS.contains(&tool.as_str()) {
            let input = block.get("input");
            let delegate = input
                .and_then(|i| non_empty_str(i, "subagent_type"))
                .or_else(|| input.and_then(|i| non_empty_str(i, "description")))
                .unwrap_or(tool.as_str());
            self.pending_delegate = Some(delegate.to_string());
        }
        events.push(StreamEvent::ToolInvoked { tool });
    }

    fn tool_completed(&mut self, block: &Value, events: &mut Vec<StreamEvent>) {
        let delegated = self.pending_delegate.take().map(|agent| DelegatedOutput {
            agent,
            text: tool_result_text(block),
        });
        events.push(StreamEvent::ToolCompleted { delegated });
    }
}

impl StreamDecoder for ClaudeDecoder {
    fn decode_value(&mut self, v: &Value) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        // Determine the event type from the top-level "type" field.
        let event_type = v.get("type").and_then(|t| t.as_str()).unwrap_or("");

        match event_type {
            // ----------------------------------------------------------------
            // system -- the init event announces the session id up front
            // ----------------------------------------------------------------
            "system" => {
                if let Some(session_id) = non_empty_str(v, "session_id") {
                    events.push(StreamEvent::SessionAnnounce(session_id.to_string()));
                }
            }

            // ----------------------------------------------------------------
            // assistant -- content blocks; only tool_use matters here, the
            // text blocks are narration that the result event supersedes
            // ----------------------------------------------------------------
            "assistant" => {
                for block in content_blocks(v) {
                    if block.get("type").and_then(|t| t.as_str()) == Some("tool_use") {
                        self.tool_invoked(block, &mut events);
                    }
                }
            }

            // ----------------------------------------------------------------
            // user -- carries tool_result blocks back to the model
            // ----------------------------------------------------------------
            "user" => {
                for block in content_blocks(v) {
                    if block.get("type").and_then(|t| t.as_str()) == Some("tool_result") {
                        self.tool_completed(block, &mut events);
                    }
                }
            }

            // ----------------------------------------------------------------
            // tool_use / tool_result -- sometimes emitted top-level
            // ----------------------------------------------------------------
            "tool_use" => self.tool_invoked(v, &mut events),
            "tool_result" => self.tool_completed(v, &mut events),

            // ----------------------------------------------------------------
            // result -- final text and the canonical session id
            // ----------------------------------------------------------------
            "result" => {
                events.push(StreamEvent::FinalResult {
                    text: v.get("result").and_then(|r| r.as_str()).map(str::to_string),
                    session_id: non_empty_str(v, "session_id").map(str::to_string),
                });
            }

            other => {
                debug!(event_type = other, "ignoring unrecognised stream-json event type");
            }
        }

        events
    }
}

/// `message.content` as a slice of blocks, empty when absent.
fn content_blocks(v: &Value) -> &[Value] {
    v.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Text carried by a tool_result block: either a plain string or the text
/// blocks of a content array, joined by newlines.
fn tool_result_text(block: &Value) -> String {
    match block.get("content").or_else(|| block.get("output")) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
