//! Configuration file management for relay.
//!
//! Provides a TOML-based config file at `~/.config/relay/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use relay_core::RelayConfig;
use relay_core::config::parse_timeout_secs;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub backends: BackendsSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    /// Directory backends are started in. Unset means the current directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opencode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    /// Tool allowlist for Claude Code when a run names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_tools: Option<Vec<String>>,
}

impl ConfigFile {
    /// The file `relay init` writes: every default spelled out.
    pub fn with_defaults() -> Self {
        let defaults = RelayConfig::new(".");
        Self {
            runner: RunnerSection {
                working_dir: None,
                timeout_secs: Some(defaults.default_timeout.as_secs()),
                persona_dir: Some(defaults.persona_dir),
            },
            backends: BackendsSection {
                claude: Some(defaults.claude_binary),
                opencode: Some(defaults.opencode_binary),
                gemini: Some(defaults.gemini_binary),
                claude_tools: Some(defaults.claude_tools),
            },
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the relay config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/relay` or `~/.config/relay`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("relay");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("relay")
}

/// Return the path to the relay config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Load the config file if one exists. A missing file is not an error, a
/// malformed one is.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(None);
    }
    debug!(path = %path.display(), "loading config file");
    load_config_from(&path).map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Resolve the runtime configuration: CLI flag > env var > config file >
/// default.
pub fn resolve(cli_working_dir: Option<&Path>) -> Result<RelayConfig> {
    let file = load_config()?;
    resolve_with(cli_working_dir, file.as_ref())
}

/// Resolution against an already-loaded config file.
pub fn resolve_with(cli_working_dir: Option<&Path>, file: Option<&ConfigFile>) -> Result<RelayConfig> {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    let working_dir = if let Some(dir) = cli_working_dir {
        dir.to_path_buf()
    } else if let Some(dir) = env("RELAY_WORKING_DIR") {
        PathBuf::from(dir)
    } else if let Some(dir) = file.and_then(|f| f.runner.working_dir.clone()) {
        dir
    } else {
        std::env::current_dir().context("failed to determine current directory")?
    };
    let mut config = RelayConfig::new(working_dir);

    if let Some(raw) = env("RELAY_TIMEOUT_SECS") {
        config.default_timeout = parse_timeout_secs(&raw)
            .with_context(|| format!("RELAY_TIMEOUT_SECS must be a positive number of seconds, got {raw:?}"))?;
    } else if let Some(secs) = file.and_then(|f| f.runner.timeout_secs) {
        anyhow::ensure!(secs > 0, "runner.timeout_secs must be positive");
        config.default_timeout = Duration::from_secs(secs);
    }

    if let Some(dir) = env("RELAY_PERSONA_DIR") {
        config.persona_dir = PathBuf::from(dir);
    } else if let Some(dir) = file.and_then(|f| f.runner.persona_dir.clone()) {
        config.persona_dir = dir;
    }

    let backends = file.map(|f| &f.backends);
    if let Some(bin) = env("RELAY_CLAUDE_BIN").or_else(|| backends.and_then(|b| b.claude.clone())) {
        config.claude_binary = bin;
    }
    if let Some(bin) = env("RELAY_OPENCODE_BIN").or_else(|| backends.and_then(|b| b.opencode.clone())) {
        config.opencode_binary = bin;
    }
    if let Some(bin) = env("RELAY_GEMINI_BIN").or_else(|| backends.and_then(|b| b.gemini.clone())) {
        config.gemini_binary = bin;
    }
    if let Some(tools) = backends.and_then(|b| b.claude_tools.clone()) {
        config.claude_tools = tools;
    }

    debug!(
        working_dir = %config.working_dir.display(),
        timeout_secs = config.default_timeout.as_secs(),
        persona_dir = %config.persona_dir.display(),
        "resolved runtime config"
    );
    Ok(config)
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
