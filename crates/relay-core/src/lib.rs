//! Orchestration layer for coding-agent CLIs.
//!
//! `relay-core` spawns an external agent program (Claude Code, opencode,
//! Gemini CLI), decodes its streaming output into a common event model,
//! forwards throttled progress, enforces a deadline, and returns one
//! [`AgentResult`](harness::AgentResult): final text, a continuation session
//! id, and any file artifacts the run produced.

pub mod artifacts;
pub mod config;
pub mod harness;
pub mod persona;
pub mod progress;

pub use config::RelayConfig;
pub use harness::{AgentRequest, AgentResult, AgentRunner, Outcome, RunError};
pub use persona::{Persona, PersonaError, PersonaRunner, PersonaStore};
pub use progress::{LogSink, ProgressSink};
