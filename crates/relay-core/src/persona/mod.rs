//! Personas: named instruction documents layered on the Claude Code backend.
//!
//! A persona is a markdown file `<persona_dir>/<name>.md` with optional
//! `---`-delimited frontmatter. Running a persona prepends its body to the
//! caller's message; creating one asks Claude Code to author the document.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::harness::{AgentRequest, AgentResult, AgentRunner, EMPTY_RESPONSE, RunError};
use crate::progress::ProgressSink;

/// Backend every persona runs on.
pub const PERSONA_BACKEND: &str = "claude";

/// Prompt template used by [`PersonaRunner::create`].
static AUTHORING_PROMPT: &str = include_str!("authoring_prompt.md");

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("persona {0:?} not found")]
    NotFound(String),

    #[error("invalid persona name {0:?}")]
    InvalidName(String),

    #[error("persona authoring did not complete: {0}")]
    Authoring(String),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("persona I/O failed for {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A loaded persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    /// Document body with frontmatter removed, trimmed.
    pub body: String,
    /// Title-cased name used for output attribution.
    pub display_name: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let name = name.into();
        let display_name = display_name(&name);
        Self {
            name,
            body: body.into(),
            display_name,
        }
    }

    /// The full prompt sent to the backend for `message`.
    pub fn compose_prompt(&self, message: &str) -> String {
        let display = &self.display_name;
        format!(
            "You are operating as: {display}\n\n{body}\n\n---\n\n\
             Prefix every message section with [{display}]. When you delegate to a \
             sub-agent, prefix the output you relay from it with [{display}] as well.\n\n\
             Task: {message}",
            body = self.body,
        )
    }
}

/// `code-reviewer` becomes `Code Reviewer`.
pub fn display_name(name: &str) -> String {
    name.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove a leading `---`-delimited frontmatter block. Content without a
/// complete block is returned whole. The result is trimmed.
pub fn strip_frontmatter(content: &str) -> &str {
    if content.starts_with("---") {
        let mut parts = content.splitn(3, "---");
        if let (Some(_), Some(_), Some(body)) = (parts.next(), parts.next(), parts.next()) {
            return body.trim();
        }
    }
    content.trim()
}

/// Trim, lowercase, and join whitespace-separated words with hyphens.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Unwrap a reply the model wrapped in a Markdown code fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "markdown") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn authoring_prompt(name: &str, description: &str) -> String {
    AUTHORING_PROMPT
        .replace("{{name}}", name)
        .replace("{{display_name}}", &display_name(name))
        .replace("{{description}}", description.trim())
}

fn validate_name(name: &str) -> Result<(), PersonaError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(PersonaError::InvalidName(name.to_owned()))
    }
}

/// Persona documents on disk.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    dir: PathBuf,
}

impl PersonaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, PersonaError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.md")))
    }

    /// Sorted persona names. A missing directory holds no personas.
    pub fn list(&self) -> Result<Vec<String>, PersonaError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersonaError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_owned))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<Persona, PersonaError> {
        let path = self.path_for(name)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersonaError::NotFound(name.to_owned()));
            }
            Err(source) => return Err(PersonaError::Io { path, source }),
        };
        Ok(Persona::new(name, strip_frontmatter(&content)))
    }

    /// Write `content` as the document for `name`, creating the directory.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf, PersonaError> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| PersonaError::Io {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, content).map_err(|source| PersonaError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Runs and authors personas through an [`AgentRunner`].
#[derive(Debug, Clone)]
pub struct PersonaRunner {
    store: PersonaStore,
    runner: Arc<AgentRunner>,
}

impl PersonaRunner {
    /// Use the runner's configured persona directory.
    pub fn new(runner: Arc<AgentRunner>) -> Self {
        let store = PersonaStore::new(runner.config().persona_dir.clone());
        Self { store, runner }
    }

    pub fn with_store(runner: Arc<AgentRunner>, store: PersonaStore) -> Self {
        Self { store, runner }
    }

    pub fn store(&self) -> &PersonaStore {
        &self.store
    }

    /// Run `message` as persona `name`.
    ///
    /// An unknown persona is not an error: the result lists the available
    /// names and no process is started.
    pub async fn run(
        &self,
        name: &str,
        message: &str,
        session_id: Option<String>,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<AgentResult, PersonaError> {
        let persona = match self.store.load(name) {
            Ok(persona) => persona,
            Err(PersonaError::NotFound(_) | PersonaError::InvalidName(_)) => {
                debug!(persona = name, "unknown persona");
                return Ok(AgentResult::unknown_persona(self.unknown_persona_text(name)?));
            }
            Err(e) => return Err(e),
        };

        info!(persona = %persona.name, resumed = session_id.is_some(), "running persona");
        let mut request = AgentRequest::new(PERSONA_BACKEND, persona.compose_prompt(message))
            .with_session(session_id);
        if let Some(sink) = progress {
            request = request.with_progress(sink);
        }
        Ok(self.runner.run(&request).await?)
    }

    fn unknown_persona_text(&self, name: &str) -> Result<String, PersonaError> {
        let available = self.store.list()?;
        Ok(if available.is_empty() {
            format!(
                "Unknown persona \"{name}\". No personas found in {}.",
                self.store.dir().display()
            )
        } else {
            format!(
                "Unknown persona \"{name}\". Available personas: {}",
                available.join(", ")
            )
        })
    }

    /// Author a new persona document with Claude Code and save it.
    ///
    /// Returns the saved document. Nothing is written unless the authoring
    /// run completes with text.
    pub async fn create(&self, name: &str, description: &str) -> Result<String, PersonaError> {
        let name = normalize_name(name);
        let path = self.store.path_for(&name)?;

        info!(persona = %name, "authoring persona");
        let request = AgentRequest::new(PERSONA_BACKEND, authoring_prompt(&name, description));
        let result = self.runner.run(&request).await?;
        if !result.is_completed() {
            warn!(persona = %name, outcome = ?result.outcome, "persona authoring failed");
            return Err(PersonaError::Authoring(result.text));
        }

        let body = strip_code_fence(&result.text);
        if body.is_empty() {
            warn!(persona = %name, "persona authoring returned a blank document");
            return Err(PersonaError::Authoring(EMPTY_RESPONSE.to_owned()));
        }
        let content = format!("{body}\n");
        self.store.write(&name, &content)?;
        info!(persona = %name, path = %path.display(), "persona saved");
        Ok(content)
    }
}
