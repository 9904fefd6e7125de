//! Request, result, and event types shared by every harness.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::progress::ProgressSink;

/// Text returned when a backend exits cleanly without producing any answer.
pub const EMPTY_RESPONSE: &str = "(empty response)";

/// Text returned when a backend exits with a non-zero status.
pub const AGENT_ERROR: &str = "Agent error occurred.";

/// One call into a backend.
#[derive(Clone)]
pub struct AgentRequest {
    /// Registry name of the backend (e.g. `"claude"`).
    pub backend: String,
    /// Prompt text handed to the backend verbatim.
    pub message: String,
    /// Session id from a previous result on the same backend.
    pub session_id: Option<String>,
    /// Overrides the configured default deadline.
    pub timeout: Option<Duration>,
    /// Overrides the backend's default tool allowlist.
    pub allowed_tools: Option<Vec<String>>,
    /// Receives throttled status lines while the backend works.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl AgentRequest {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
            session_id: None,
            timeout: None,
            allowed_tools: None,
            progress: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

impl std::fmt::Debug for AgentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRequest")
            .field("backend", &self.backend)
            .field("message", &self.message)
            .field("session_id", &self.session_id)
            .field("timeout", &self.timeout)
            .field("allowed_tools", &self.allowed_tools)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// How an invocation ended.
///
/// Callers never need to branch on this: [`AgentResult::text`] always holds
/// a complete human-readable answer. It exists for logging and for layers
/// (like persona authoring) that must not persist failure prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Exit code 0 with answer text.
    Completed,
    /// Exit code 0 but no answer text; the placeholder was substituted.
    Empty,
    /// Non-zero exit (or signal).
    Failed,
    /// The deadline expired and the process was killed.
    TimedOut,
    /// A persona lookup failed before any process was spawned.
    UnknownPersona,
}

/// Text a sub-agent produced, attributed to the delegate that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegatedOutput {
    pub agent: String,
    pub text: String,
}

/// The single result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentResult {
    /// Answer, error, or timeout prose. Never empty.
    pub text: String,
    /// Opaque continuation token; echo it back verbatim to resume.
    pub session_id: Option<String>,
    /// Existing, non-empty files referenced in the transcript, first-seen order.
    pub artifacts: Vec<PathBuf>,
    /// Sub-agent outputs in the order their tool results arrived.
    pub delegations: Vec<DelegatedOutput>,
    pub outcome: Outcome,
}

impl AgentResult {
    pub fn timed_out(timeout: Duration, session_id: Option<String>) -> Self {
        Self {
            text: format!("Timed out after {}s", whole_secs_rounded_up(timeout)),
            session_id,
            artifacts: Vec::new(),
            delegations: Vec::new(),
            outcome: Outcome::TimedOut,
        }
    }

    pub fn failed(session_id: Option<String>) -> Self {
        Self {
            text: AGENT_ERROR.to_owned(),
            session_id,
            artifacts: Vec::new(),
            delegations: Vec::new(),
            outcome: Outcome::Failed,
        }
    }

    pub fn unknown_persona(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: None,
            artifacts: Vec::new(),
            delegations: Vec::new(),
            outcome: Outcome::UnknownPersona,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

/// One normalized event decoded from a single line of backend output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The backend told us its session id.
    SessionAnnounce(String),
    /// A piece of final-answer text, appended in arrival order.
    TextFragment(String),
    /// The agent started a tool call.
    ToolInvoked { tool: String },
    /// A tool call returned. Carries the sub-agent's output when the call
    /// was a delegation.
    ToolCompleted { delegated: Option<DelegatedOutput> },
    /// Terminal event; either field may be absent depending on backend.
    FinalResult {
        text: Option<String>,
        session_id: Option<String>,
    },
    /// The line could not be parsed and was skipped.
    Unparseable,
}

fn whole_secs_rounded_up(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_text_uses_whole_seconds() {
        let r = AgentResult::timed_out(Duration::from_secs(1), Some("s-1".into()));
        assert_eq!(r.text, "Timed out after 1s");
        assert_eq!(r.session_id.as_deref(), Some("s-1"));
        assert!(r.artifacts.is_empty());
        assert_eq!(r.outcome, Outcome::TimedOut);
    }

    #[test]
    fn timed_out_text_rounds_fractional_deadlines_up() {
        let r = AgentResult::timed_out(Duration::from_millis(500), None);
        assert_eq!(r.text, "Timed out after 1s");
        let r = AgentResult::timed_out(Duration::from_millis(2001), None);
        assert_eq!(r.text, "Timed out after 3s");
    }

    #[test]
    fn failed_uses_generic_error_text() {
        let r = AgentResult::failed(None);
        assert_eq!(r.text, AGENT_ERROR);
        assert_eq!(r.outcome, Outcome::Failed);
        assert!(!r.is_completed());
    }

    #[test]
    fn unknown_persona_has_no_session() {
        let r = AgentResult::unknown_persona("Unknown persona");
        assert!(r.session_id.is_none());
        assert_eq!(r.outcome, Outcome::UnknownPersona);
    }

    #[test]
    fn request_builder_sets_fields() {
        let req = AgentRequest::new("gemini", "hi")
            .with_session(Some("abc".into()))
            .with_timeout(Duration::from_secs(9))
            .with_tools(vec!["Read".into()]);
        assert_eq!(req.backend, "gemini");
        assert_eq!(req.session_id.as_deref(), Some("abc"));
        assert_eq!(req.timeout, Some(Duration::from_secs(9)));
        assert_eq!(req.allowed_tools, Some(vec!["Read".to_string()]));
        assert!(format!("{req:?}").contains("progress: false"));
    }

    #[test]
    fn result_serializes_outcome_in_snake_case() {
        let r = AgentResult::timed_out(Duration::from_secs(2), None);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["outcome"], "timed_out");
        assert_eq!(json["text"], "Timed out after 2s");
    }
}
