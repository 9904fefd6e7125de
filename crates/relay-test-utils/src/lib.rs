//! Shared test utilities for relay integration tests.
//!
//! Provides fake backend executables: small `/bin/sh` scripts that print
//! canned JSONL to stdout the way a real coding-agent CLI would, optionally
//! recording the argv they were called with so tests can assert on the
//! exact command line.

use std::path::{Path, PathBuf};

/// Quote `s` for inclusion in a POSIX shell script as a single word.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Build shell lines that print each entry of `lines` verbatim, one per line.
pub fn emit_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("printf '%s\\n' {}\n", shell_quote(line)))
        .collect()
}

/// Serialize JSON values into JSONL lines.
pub fn jsonl(events: &[serde_json::Value]) -> Vec<String> {
    events.iter().map(|e| e.to_string()).collect()
}

/// Write an executable shell script at `dir/name` with the given body.
///
/// A `#!/bin/sh` shebang is prepended. Returns the script path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}"))
        .unwrap_or_else(|e| panic!("failed to write script {}: {e}", path.display()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|e| panic!("failed to chmod script {}: {e}", path.display()));
    }

    path
}

/// Describes a fake backend: what it prints, how it exits, and where (if
/// anywhere) it records the argv it received.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    lines: Vec<String>,
    exit_code: i32,
    argv_file: Option<PathBuf>,
    marker_file: Option<PathBuf>,
    stderr: Option<String>,
}

impl FakeBackend {
    /// A backend that prints nothing and exits 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Print these raw lines (need not be JSON).
    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Print these JSON events, one per line.
    pub fn events(mut self, events: &[serde_json::Value]) -> Self {
        self.lines.extend(jsonl(events));
        self
    }

    /// Exit with this status after printing.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Write `$@`, one argument per line, to `path` before printing.
    pub fn record_argv(mut self, path: impl Into<PathBuf>) -> Self {
        self.argv_file = Some(path.into());
        self
    }

    /// Touch `path` as soon as the script starts.
    pub fn touch_on_start(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker_file = Some(path.into());
        self
    }

    /// Print `text` to stderr before exiting.
    pub fn stderr(mut self, text: impl Into<String>) -> Self {
        self.stderr = Some(text.into());
        self
    }

    /// Render the script body (without shebang).
    pub fn script(&self) -> String {
        let mut body = String::new();
        if let Some(marker) = &self.marker_file {
            body.push_str(&format!(
                ": > {}\n",
                shell_quote(&marker.display().to_string())
            ));
        }
        if let Some(argv) = &self.argv_file {
            body.push_str(&format!(
                "printf '%s\\n' \"$@\" > {}\n",
                shell_quote(&argv.display().to_string())
            ));
        }
        body.push_str(&emit_lines(&self.lines));
        if let Some(stderr) = &self.stderr {
            body.push_str(&format!("printf '%s\\n' {} >&2\n", shell_quote(stderr)));
        }
        body.push_str(&format!("exit {}\n", self.exit_code));
        body
    }

    /// Write the script into `dir/name` and return its path.
    pub fn install(&self, dir: &Path, name: &str) -> PathBuf {
        write_script(dir, name, &self.script())
    }
}

/// Read an argv file written by [`FakeBackend::record_argv`].
///
/// Arguments containing newlines are split across entries, so tests should
/// only assert on single-line arguments or use `contains` on the joined text.
pub fn read_argv(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read argv file {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}
