//! Gemini CLI harness adapter.
//!
//! Spawns `gemini -p <message> --output-format stream-json --yolo` and
//! decodes its JSONL output.

use serde_json::Value;
use tracing::debug;

use super::trait_def::{Harness, Invocation, StreamDecoder, non_empty_str};
use super::types::StreamEvent;
use crate::config::RelayConfig;

/// Harness adapter for the Gemini CLI.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    binary_path: String,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self::with_binary("gemini")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary_path: path.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::with_binary(config.gemini_binary.clone())
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness for GeminiAdapter {
    fn name(&self) -> &str {
        "gemini"
    }

    fn binary(&self) -> &str {
        &self.binary_path
    }

    fn build_args(&self, invocation: &Invocation<'_>) -> Vec<String> {
        let mut args: Vec<String> = [
            "-p",
            invocation.message,
            "--output-format",
            "stream-json",
            "--yolo",
        ]
        .map(str::to_string)
        .to_vec();
        if let Some(session_id) = invocation.session_id {
            args.push("--resume".to_string());
            args.push(session_id.to_string());
        }
        args
    }

    fn decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(GeminiDecoder)
    }
}

/// Decoder for Gemini CLI stream-json. Stateless.
#[derive(Debug, Default)]
pub struct GeminiDecoder;

impl StreamDecoder for GeminiDecoder {
    fn decode_value(&mut self, v: &Value) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
            "init" => {
                if let Some(session_id) = non_empty_str(v, "session_id") {
                    events.push(StreamEvent::SessionAnnounce(session_id.to_string()));
                }
            }
            "message" => {
                // Only assistant deltas are answer text. Full (non-delta)
                // messages repeat earlier deltas and user turns are echoes.
                let is_delta = v.get("delta").and_then(|d| d.as_bool()) == Some(true);
                let is_assistant = v.get("role").and_then(|r| r.as_str()) == Some("assistant");
                if is_delta && is_assistant {
                    if let Some(text) = v.get("content").and_then(|c| c.as_str()) {
                        events.push(StreamEvent::TextFragment(text.to_string()));
                    }
                }
            }
            "tool_use" => {
                let tool = v
                    .get("tool_name")
                    .and_then(|t| t.as_str())
                    .unwrap_or("tool")
                    .to_string();
                events.push(StreamEvent::ToolInvoked { tool });
            }
            "tool_result" => events.push(StreamEvent::ToolCompleted { delegated: None }),
            "result" => events.push(StreamEvent::FinalResult {
                text: None,
                session_id: None,
            }),
            other => debug!(event_type = other, "ignoring gemini event"),
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(session: Option<&str>) -> Vec<String> {
        GeminiAdapter::new().build_args(&Invocation {
            message: "hello",
            session_id: session,
            allowed_tools: &[],
        })
    }

    #[test]
    fn args_always_use_stream_json_and_yolo() {
        assert_eq!(
            args_for(None),
            vec!["-p", "hello", "--output-format", "stream-json", "--yolo"]
        );
    }

    #[test]
    fn args_with_session_append_resume() {
        let args = args_for(Some("prev-session-id"));
        assert_eq!(&args[5..], &["--resume", "prev-session-id"]);
    }

    #[test]
    fn init_announces_session() {
        let mut d = GeminiDecoder;
        assert_eq!(
            d.decode_line(r#"{"type":"init","session_id":"abc-123","model":"gemini-3"}"#),
            vec![StreamEvent::SessionAnnounce("abc-123".into())]
        );
    }

    #[test]
    fn assistant_delta_is_text() {
        let mut d = GeminiDecoder;
        assert_eq!(
            d.decode_line(
                r#"{"type":"message","role":"assistant","content":"Hello there!","delta":true}"#
            ),
            vec![StreamEvent::TextFragment("Hello there!".into())]
        );
    }

    #[test]
    fn user_echo_and_non_delta_messages_are_ignored() {
        let mut d = GeminiDecoder;
        assert!(
            d.decode_line(r#"{"type":"message","role":"user","content":"this is user echo"}"#)
                .is_empty()
        );
        assert!(
            d.decode_line(r#"{"type":"message","role":"user","content":"x","delta":true}"#)
                .is_empty()
        );
        assert!(
            d.decode_line(r#"{"type":"message","role":"assistant","content":"full"}"#)
                .is_empty()
        );
        assert!(
            d.decode_line(r#"{"type":"message","role":"assistant","content":"x","delta":false}"#)
                .is_empty()
        );
    }

    #[test]
    fn tool_events_and_result() {
        let mut d = GeminiDecoder;
        assert_eq!(
            d.decode_line(
                r#"{"type":"tool_use","tool_name":"run_shell_command","tool_id":"t1","parameters":{"command":"ls"}}"#
            ),
            vec![StreamEvent::ToolInvoked {
                tool: "run_shell_command".into()
            }]
        );
        assert_eq!(
            d.decode_line(r#"{"type":"tool_result","tool_id":"t1","status":"success","output":"a"}"#),
            vec![StreamEvent::ToolCompleted { delegated: None }]
        );
        assert_eq!(
            d.decode_line(r#"{"type":"result","status":"success","stats":{"tool_calls":1}}"#),
            vec![StreamEvent::FinalResult {
                text: None,
                session_id: None
            }]
        );
    }
}
