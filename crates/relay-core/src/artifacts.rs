//! Artifact discovery.
//!
//! Scans a run transcript for absolute paths to document and image files
//! and keeps the ones that exist on disk as non-empty regular files.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Absolute path ending in a known document or image extension. The leading
/// group stops matches from starting inside a relative path or URL, but lets
/// one follow a JSON escape such as `\n`, since transcripts are raw JSON lines.
static ARTIFACT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|\\[ntr]|[^\w.~/-])(/(?:[\w.-]+/)*[\w.-]+\.(?:pdf|docx|xlsx|pptx|csv|png|jpe?g|gif|webp|svg))\b",
    )
    .expect("artifact regex is valid")
});

/// Every candidate path in `transcript`, de-duplicated in first-seen order.
/// Nothing is checked against the filesystem.
pub fn candidate_paths(transcript: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    ARTIFACT_PATH
        .captures_iter(transcript)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|p| seen.insert(*p))
        .map(PathBuf::from)
        .collect()
}

/// Candidate paths that name an existing, non-empty regular file.
pub fn scan_artifacts(transcript: &str) -> Vec<PathBuf> {
    candidate_paths(transcript)
        .into_iter()
        .filter(|path| match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "artifact candidate not found");
                false
            }
        })
        .collect()
}
