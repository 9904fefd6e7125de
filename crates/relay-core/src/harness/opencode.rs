//! opencode harness adapter.
//!
//! Spawns `opencode run <message> --format json` and decodes its NDJSON
//! event stream.

use serde_json::Value;
use tracing::debug;

use super::trait_def::{Harness, Invocation, StreamDecoder, non_empty_str};
use super::types::StreamEvent;
use crate::config::RelayConfig;

/// Harness adapter for [opencode](https://opencode.ai).
#[derive(Debug, Clone)]
pub struct OpenCodeAdapter {
    binary_path: String,
}

impl OpenCodeAdapter {
    pub fn new() -> Self {
        Self::with_binary("opencode")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary_path: path.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::with_binary(config.opencode_binary.clone())
    }
}

impl Default for OpenCodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness for OpenCodeAdapter {
    fn name(&self) -> &str {
        "opencode"
    }

    fn binary(&self) -> &str {
        &self.binary_path
    }

    fn build_args(&self, invocation: &Invocation<'_>) -> Vec<String> {
        let mut args: Vec<String> = ["run", invocation.message, "--format", "json"]
            .map(str::to_string)
            .to_vec();
        if let Some(session_id) = invocation.session_id {
            args.push("--session".to_string());
            args.push(session_id.to_string());
        }
        args
    }

    fn decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(OpenCodeDecoder)
    }
}

/// Decoder for opencode's JSON event stream. Stateless.
#[derive(Debug, Default)]
pub struct OpenCodeDecoder;

impl StreamDecoder for OpenCodeDecoder {
    fn decode_value(&mut self, v: &Value) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        // Any event may carry the session id; empty values never count.
        if let Some(session_id) = non_empty_str(v, "sessionID") {
            events.push(StreamEvent::SessionAnnounce(session_id.to_string()));
        }

        let part = v.get("part");
        match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
            "text" => {
                if let Some(text) = part.and_then(|p| p.get("text")).and_then(|t| t.as_str()) {
                    events.push(StreamEvent::TextFragment(text.to_string()));
                }
            }
            "tool_use" => {
                let tool = part
                    .and_then(|p| p.get("tool").or_else(|| p.get("name")))
                    .and_then(|t| t.as_str())
                    .unwrap_or("tool")
                    .to_string();
                events.push(StreamEvent::ToolInvoked { tool });
            }
            "tool_result" => events.push(StreamEvent::ToolCompleted { delegated: None }),
            other => debug!(event_type = other, "ignoring opencode event"),
        }

        events
    }
}
