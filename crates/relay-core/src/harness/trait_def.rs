//! The `Harness` trait -- the adapter interface for agent CLIs.
//!
//! Each concrete harness (Claude Code, opencode, Gemini CLI) implements this
//! trait. The trait is intentionally object-safe so it can be stored as
//! `Box<dyn Harness>` in the [`super::HarnessRegistry`].

use anyhow::{Context, Result};
use tracing::debug;

use super::types::StreamEvent;

/// Per-call inputs a harness needs to build its command line.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
    /// Already resolved: the request's allowlist, else the harness default.
    pub allowed_tools: &'a [String],
}

/// Adapter interface for one agent CLI.
///
/// Implementors describe how to launch the CLI and hand out a fresh
/// [`StreamDecoder`] for each invocation. Process lifecycle, deadlines and
/// result aggregation live in [`super::runner`] and are shared by all
/// harnesses.
pub trait Harness: Send + Sync {
    /// Registry name for this harness (e.g. "claude").
    fn name(&self) -> &str;

    /// Executable to spawn.
    fn binary(&self) -> &str;

    /// Tool allowlist used when the request carries none.
    fn default_tools(&self) -> &[String] {
        &[]
    }

    /// Build the argv (excluding the executable) for one invocation.
    fn build_args(&self, invocation: &Invocation<'_>) -> Vec<String>;

    /// Environment variables to strip from the child's inherited environment.
    fn env_remove(&self) -> Vec<String> {
        Vec::new()
    }

    /// A decoder with fresh state, owned by exactly one invocation.
    fn decoder(&self) -> Box<dyn StreamDecoder>;
}

/// Turns one line of backend output into normalized events.
///
/// Decoders may carry state across lines (e.g. a pending delegation), which
/// is why [`Harness::decoder`] hands out a new one per invocation.
pub trait StreamDecoder: Send {
    /// Interpret one parsed JSON line.
    fn decode_value(&mut self, value: &serde_json::Value) -> Vec<StreamEvent>;

    /// Decode a raw output line.
    ///
    /// Blank lines yield nothing. Lines that are not valid JSON yield a
    /// single [`StreamEvent::Unparseable`] and never abort the stream.
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        match parse_json_line(trimmed) {
            Ok(value) => self.decode_value(&value),
            Err(e) => {
                debug!(error = %e, "skipping malformed stream line");
                vec![StreamEvent::Unparseable]
            }
        }
    }
}

/// Parse a single JSONL line.
///
/// Returns `Err` if the line is not valid JSON. Callers treat that as a
/// skipped line and keep reading.
pub fn parse_json_line(line: &str) -> Result<serde_json::Value> {
    serde_json::from_str(line).context("malformed JSON in stream output")
}

/// Read a string field, treating an empty string as absent.
pub(crate) fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

// Compile-time assertion: Harness must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Harness) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    /// A harness that echoes its message, used only to prove the trait can
    /// be implemented and used as `dyn Harness`.
    struct EchoHarness;

    struct EchoDecoder;

    impl StreamDecoder for EchoDecoder {
        fn decode_value(&mut self, value: &serde_json::Value) -> Vec<StreamEvent> {
            match value.get("text").and_then(|t| t.as_str()) {
                Some(text) => vec![StreamEvent::TextFragment(text.to_string())],
                None => Vec::new(),
            }
        }
    }

    impl Harness for EchoHarness {
        fn name(&self) -> &str {
            "echo"
        }

        fn binary(&self) -> &str {
            "echo"
        }

        fn build_args(&self, invocation: &Invocation<'_>) -> Vec<String> {
            vec![invocation.message.to_string()]
        }

        fn decoder(&self) -> Box<dyn StreamDecoder> {
            Box::new(EchoDecoder)
        }
    }

    #[test]
    fn harness_is_object_safe() {
        let harness: Box<dyn Harness> = Box::new(EchoHarness);
        assert_eq!(harness.name(), "echo");
        assert!(harness.default_tools().is_empty());
        assert!(harness.env_remove().is_empty());

        let args = harness.build_args(&Invocation {
            message: "hello",
            session_id: None,
            allowed_tools: &[],
        });
        assert_eq!(args, vec!["hello"]);
    }

    #[test]
    fn decode_line_skips_blank_lines() {
        let mut decoder = EchoDecoder;
        assert!(decoder.decode_line("").is_empty());
        assert!(decoder.decode_line("   \r").is_empty());
    }

    #[test]
    fn decode_line_marks_garbage_unparseable() {
        let mut decoder = EchoDecoder;
        assert_eq!(
            decoder.decode_line("not json {{{"),
            vec![StreamEvent::Unparseable]
        );
    }

    #[test]
    fn decode_line_trims_before_parsing() {
        let mut decoder = EchoDecoder;
        assert_eq!(
            decoder.decode_line("  {\"text\":\"hi\"}\r"),
            vec![StreamEvent::TextFragment("hi".into())]
        );
    }

    #[test]
    fn non_empty_str_filters_empty_values() {
        let v = serde_json::json!({"a": "x", "b": "", "c": 3});
        assert_eq!(non_empty_str(&v, "a"), Some("x"));
        assert_eq!(non_empty_str(&v, "b"), None);
        assert_eq!(non_empty_str(&v, "c"), None);
        assert_eq!(non_empty_str(&v, "d"), None);
    }
}
