use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Runtime configuration shared by every invocation.
///
/// Reads `RELAY_*` environment variables, falling back to built-in defaults
/// when unset.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Directory every backend process is started in.
    pub working_dir: PathBuf,
    /// Deadline applied when a request carries no timeout of its own.
    pub default_timeout: Duration,
    /// Directory holding persona markdown files.
    pub persona_dir: PathBuf,
    /// Claude Code executable.
    pub claude_binary: String,
    /// opencode executable.
    pub opencode_binary: String,
    /// Gemini CLI executable.
    pub gemini_binary: String,
    /// Tool allowlist passed to Claude Code when a request names none.
    pub claude_tools: Vec<String>,
    /// Environment variable Claude Code sets inside its own sessions; it is
    /// removed before spawning so the child does not refuse to start nested.
    pub nested_session_var: String,
}

impl RelayConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
    pub const NESTED_SESSION_VAR: &str = "CLAUDECODE";
    pub const DEFAULT_CLAUDE_TOOLS: [&str; 8] = [
        "Bash",
        "Read",
        "Write",
        "Edit",
        "Glob",
        "Grep",
        "WebSearch",
        "WebFetch",
    ];

    /// Build a config rooted at `working_dir` with every other field at its
    /// default.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            default_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            persona_dir: Self::default_persona_dir(),
            claude_binary: "claude".to_owned(),
            opencode_binary: "opencode".to_owned(),
            gemini_binary: "gemini".to_owned(),
            claude_tools: Self::DEFAULT_CLAUDE_TOOLS
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            nested_session_var: Self::NESTED_SESSION_VAR.to_owned(),
        }
    }

    /// Build a config from the environment.
    ///
    /// Recognised variables: `RELAY_WORKING_DIR`, `RELAY_TIMEOUT_SECS`,
    /// `RELAY_PERSONA_DIR`, `RELAY_CLAUDE_BIN`, `RELAY_OPENCODE_BIN`,
    /// `RELAY_GEMINI_BIN`. An unparseable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        let working_dir = env::var_os("RELAY_WORKING_DIR")
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::new(working_dir);

        if let Ok(raw) = env::var("RELAY_TIMEOUT_SECS") {
            match parse_timeout_secs(&raw) {
                Some(timeout) => config.default_timeout = timeout,
                None => warn!(value = %raw, "ignoring invalid RELAY_TIMEOUT_SECS"),
            }
        }
        if let Some(dir) = env::var_os("RELAY_PERSONA_DIR") {
            config.persona_dir = PathBuf::from(dir);
        }
        if let Ok(bin) = env::var("RELAY_CLAUDE_BIN") {
            config.claude_binary = bin;
        }
        if let Ok(bin) = env::var("RELAY_OPENCODE_BIN") {
            config.opencode_binary = bin;
        }
        if let Ok(bin) = env::var("RELAY_GEMINI_BIN") {
            config.gemini_binary = bin;
        }
        config
    }

    /// `~/.claude/agents`, the directory Claude Code reads sub-agent
    /// definitions from.
    pub fn default_persona_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude")
            .join("agents")
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_persona_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persona_dir = dir.into();
        self
    }

    pub fn with_claude_binary(mut self, path: impl Into<String>) -> Self {
        self.claude_binary = path.into();
        self
    }

    pub fn with_opencode_binary(mut self, path: impl Into<String>) -> Self {
        self.opencode_binary = path.into();
        self
    }

    pub fn with_gemini_binary(mut self, path: impl Into<String>) -> Self {
        self.gemini_binary = path.into();
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Parse a positive whole number of seconds.
pub fn parse_timeout_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
