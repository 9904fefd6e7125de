//! Folds decoded events into the final [`AgentResult`].

use std::path::PathBuf;

use super::types::{AgentResult, DelegatedOutput, EMPTY_RESPONSE, Outcome, StreamEvent};

/// Accumulates one invocation's events.
#[derive(Debug, Default)]
pub struct Collector {
    session_id: Option<String>,
    fragments: String,
    final_text: Option<String>,
    delegations: Vec<DelegatedOutput>,
    transcript: Vec<String>,
}

impl Collector {
    /// Start a collector. `session_id` is the id the caller resumed with, if
    /// any; it stands until the backend announces a new one.
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::SessionAnnounce(id) => self.announce(Some(id)),
            StreamEvent::TextFragment(text) => self.fragments.push_str(&text),
            StreamEvent::ToolCompleted {
                delegated: Some(output),
            } => self.delegations.push(output),
            StreamEvent::FinalResult { text, session_id } => {
                self.announce(session_id);
                if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                    self.final_text = Some(text);
                }
            }
            StreamEvent::ToolInvoked { .. }
            | StreamEvent::ToolCompleted { delegated: None }
            | StreamEvent::Unparseable => {}
        }
    }

    fn announce(&mut self, id: Option<String>) {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            self.session_id = Some(id);
        }
    }

    /// Keep a raw output line for the artifact scan.
    pub fn record_line(&mut self, line: &str) {
        self.transcript.push(line.to_owned());
    }

    /// Every raw line seen so far, newline-joined.
    pub fn transcript(&self) -> String {
        self.transcript.join("\n")
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Consume the collector into a successful-exit result.
    ///
    /// A non-blank terminal result text wins over streamed fragments. The
    /// placeholder is returned only when no text arrived at all.
    pub fn finish(self, artifacts: Vec<PathBuf>) -> AgentResult {
        let text = self.final_text.unwrap_or(self.fragments);
        let (text, outcome) = if text.is_empty() {
            (EMPTY_RESPONSE.to_owned(), Outcome::Empty)
        } else {
            (text, Outcome::Completed)
        };
        AgentResult {
            text,
            session_id: self.session_id,
            artifacts,
            delegations: self.delegations,
            outcome,
        }
    }

    /// Consume the collector into a non-zero-exit result.
    pub fn into_failed(self) -> AgentResult {
        AgentResult::failed(self.session_id)
    }

    /// Session observed so far, for the timeout path.
    pub fn into_session_id(self) -> Option<String> {
        self.session_id
    }
}
