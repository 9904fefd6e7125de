//! Harness adapter interface for coding-agent CLIs.
//!
//! This module defines the [`Harness`] trait that every backend adapter
//! implements, the normalized [`StreamEvent`] model its decoder produces,
//! and the [`AgentRunner`] that drives one invocation end to end.
//!
//! # Architecture
//!
//! ```text
//! AgentRunner::run(request)
//!     |
//!     v
//! HarnessRegistry --get("claude")--> &dyn Harness
//!     |                                   |
//!     |   build_args / env_remove --------+--> launcher::launch
//!     |                                            |
//!     |                                        stdout lines
//!     |                                            |
//!     |   decoder().decode_line(line) --> Vec<StreamEvent>
//!     |        |                  |
//!     |   ProgressState       Collector
//!     |   (throttled sink)        |
//!     |                       finish(scan_artifacts(transcript))
//!     v
//! AgentResult { text, session_id, artifacts, .. }
//! ```

pub mod aggregate;
pub mod claude_code;
pub mod gemini;
pub mod launcher;
pub mod opencode;
pub mod registry;
pub mod runner;
pub mod trait_def;
pub mod types;

// Re-export the primary public API at the module level.
pub use claude_code::ClaudeCodeAdapter;
pub use gemini::GeminiAdapter;
pub use opencode::OpenCodeAdapter;
pub use registry::HarnessRegistry;
pub use runner::{AgentRunner, RunError, run_harness};
pub use trait_def::{Harness, Invocation, StreamDecoder};
pub use types::{
    AGENT_ERROR, AgentRequest, AgentResult, DelegatedOutput, EMPTY_RESPONSE, Outcome, StreamEvent,
};
