//! Integration tests for persona run/create on top of a fake Claude Code.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use relay_core::persona::display_name;
use relay_core::{AgentRunner, Outcome, PersonaError, PersonaRunner, PersonaStore, RelayConfig};
use relay_test_utils::{FakeBackend, read_argv};

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn persona_dir(&self) -> std::path::PathBuf {
        self.path("agents")
    }

    fn runner(&self, claude: &Path) -> PersonaRunner {
        let config = RelayConfig::new(self.dir.path())
            .with_timeout(Duration::from_secs(20))
            .with_persona_dir(self.persona_dir())
            .with_claude_binary(claude.display().to_string());
        PersonaRunner::new(Arc::new(AgentRunner::new(config)))
    }
}

#[tokio::test]
async fn unknown_persona_lists_available_and_spawns_nothing() {
    let env = Env::new();
    let store = PersonaStore::new(env.persona_dir());
    store.write("writer", "Write.").unwrap();
    store.write("analyst", "Analyse.").unwrap();

    let marker = env.path("spawned");
    let bin = FakeBackend::new()
        .touch_on_start(&marker)
        .events(&[json!({"type": "result", "result": "should not run"})])
        .install(env.dir.path(), "claude");

    let result = env
        .runner(&bin)
        .run("poet", "write a haiku", Some("sess-x".into()), None)
        .await
        .unwrap();

    assert_eq!(result.outcome, Outcome::UnknownPersona);
    assert!(result.text.contains("poet"));
    assert!(result.text.contains("analyst, writer"), "{}", result.text);
    assert!(result.session_id.is_none());
    assert!(!marker.exists(), "no backend process may be started");
}

#[tokio::test]
async fn unknown_persona_with_no_directory_says_so() {
    let env = Env::new();
    let bin = FakeBackend::new().install(env.dir.path(), "claude");
    let result = env.runner(&bin).run("ghost", "x", None, None).await.unwrap();
    assert_eq!(result.outcome, Outcome::UnknownPersona);
    assert!(result.text.contains("No personas found"), "{}", result.text);
}

#[tokio::test]
async fn persona_prompt_wraps_task_and_resumes_session() {
    let env = Env::new();
    PersonaStore::new(env.persona_dir())
        .write(
            "code-reviewer",
            "---\nname: code-reviewer\n---\nYou review code harshly.\n",
        )
        .unwrap();

    let argv = env.path("argv.txt");
    let bin = FakeBackend::new()
        .record_argv(&argv)
        .events(&[json!({"type": "result", "result": "[Code Reviewer] LGTM", "session_id": "s-2"})])
        .install(env.dir.path(), "claude");

    let result = env
        .runner(&bin)
        .run("code-reviewer", "check lib.rs", Some("s-1".into()), None)
        .await
        .unwrap();
    assert_eq!(result.text, "[Code Reviewer] LGTM");
    assert_eq!(result.session_id.as_deref(), Some("s-2"));

    let args = read_argv(&argv);
    assert_eq!(&args[..3], &["--resume", "s-1", "-p"]);
    let joined = args.join("\n");
    assert!(joined.contains("You are operating as: Code Reviewer"));
    assert!(joined.contains("You review code harshly."));
    assert!(!joined.contains("name: code-reviewer"), "frontmatter must be stripped");
    assert!(joined.contains("Task: check lib.rs"));
}

#[tokio::test]
async fn create_writes_normalized_name_and_strips_fence() {
    let env = Env::new();
    let doc = "```markdown\n---\nname: data-analyst\n---\n\n# Data Analyst\n\n## Identity\nNumbers.\n```";
    let bin = FakeBackend::new()
        .events(&[json!({"type": "result", "result": doc, "session_id": "author"})])
        .install(env.dir.path(), "claude");
    let runner = env.runner(&bin);

    let content = runner.create("  Data Analyst ", "crunches numbers").await.unwrap();
    assert!(content.starts_with("---\nname: data-analyst"));
    assert!(!content.contains("```"));

    let saved = std::fs::read_to_string(env.persona_dir().join("data-analyst.md")).unwrap();
    assert_eq!(saved, content);
    assert_eq!(runner.store().list().unwrap(), vec!["data-analyst"]);

    let persona = runner.store().load("data-analyst").unwrap();
    assert!(persona.body.starts_with("# Data Analyst"));
    assert_eq!(persona.display_name, display_name("data-analyst"));
}

#[tokio::test]
async fn create_starts_a_fresh_session_without_persona_layer() {
    let env = Env::new();
    let argv = env.path("argv.txt");
    let bin = FakeBackend::new()
        .record_argv(&argv)
        .events(&[json!({"type": "result", "result": "# Doc"})])
        .install(env.dir.path(), "claude");

    env.runner(&bin).create("writer", "writes prose").await.unwrap();
    let args = read_argv(&argv);
    assert_eq!(args[0], "-p");
    assert!(!args.iter().any(|a| a == "--resume"));
    assert!(!args.join("\n").contains("You are operating as"));
}

#[tokio::test]
async fn failed_authoring_writes_nothing() {
    let env = Env::new();
    let bin = FakeBackend::new()
        .events(&[json!({"type": "result", "result": "partial doc"})])
        .exit_code(1)
        .install(env.dir.path(), "claude");

    let err = env.runner(&bin).create("writer", "x").await.unwrap_err();
    assert!(matches!(err, PersonaError::Authoring(_)), "got {err:?}");
    assert!(!env.persona_dir().join("writer.md").exists());
}

#[tokio::test]
async fn empty_authoring_writes_nothing() {
    let env = Env::new();
    let bin = FakeBackend::new().install(env.dir.path(), "claude");
    let err = env.runner(&bin).create("writer", "x").await.unwrap_err();
    assert!(matches!(err, PersonaError::Authoring(_)));
    assert!(!env.persona_dir().exists());
}

#[tokio::test]
async fn blank_authored_document_writes_nothing() {
    let env = Env::new();
    let bin = FakeBackend::new()
        .events(&[json!({"type": "result", "result": "```markdown\n  \n```"})])
        .install(env.dir.path(), "claude");
    let err = env.runner(&bin).create("writer", "x").await.unwrap_err();
    assert!(matches!(err, PersonaError::Authoring(_)), "got {err:?}");
    assert!(!env.persona_dir().join("writer.md").exists());
}
