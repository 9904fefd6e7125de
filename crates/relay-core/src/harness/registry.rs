//! Harness registry -- a named collection of available harness adapters.
//!
//! The registry lets callers pick a backend by name at runtime (e.g. when a
//! request names `backend = "opencode"`).

use std::collections::HashMap;

use super::claude_code::ClaudeCodeAdapter;
use super::gemini::GeminiAdapter;
use super::opencode::OpenCodeAdapter;
use super::trait_def::Harness;
use crate::config::RelayConfig;

/// A collection of registered [`Harness`] implementations, keyed by name.
///
/// # Example
///
/// ```ignore
/// let mut registry = HarnessRegistry::new();
/// registry.register(ClaudeCodeAdapter::new());
/// let harness = registry.get("claude").unwrap();
/// ```
#[derive(Default)]
pub struct HarnessRegistry {
    harnesses: HashMap<String, Box<dyn Harness>>,
}

impl HarnessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the three built-in backends, with binaries and
    /// defaults taken from `config`.
    pub fn with_defaults(config: &RelayConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ClaudeCodeAdapter::from_config(config));
        registry.register(OpenCodeAdapter::from_config(config));
        registry.register(GeminiAdapter::from_config(config));
        registry
    }

    /// Register a harness adapter.
    ///
    /// The harness is stored under the name returned by [`Harness::name`].
    /// If a harness with the same name is already registered, it is
    /// replaced and the old one is returned.
    pub fn register(&mut self, harness: impl Harness + 'static) -> Option<Box<dyn Harness>> {
        let name = harness.name().to_string();
        self.harnesses.insert(name, Box::new(harness))
    }

    /// Look up a harness by name.
    pub fn get(&self, name: &str) -> Option<&dyn Harness> {
        self.harnesses.get(name).map(|b| b.as_ref())
    }

    /// Names of all registered harnesses, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.harnesses.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Return the number of registered harnesses.
    pub fn len(&self) -> usize {
        self.harnesses.len()
    }

    /// Return `true` if no harnesses are registered.
    pub fn is_empty(&self) -> bool {
        self.harnesses.is_empty()
    }
}

impl std::fmt::Debug for HarnessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessRegistry")
            .field("harnesses", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::trait_def::{Invocation, StreamDecoder};
    use crate::harness::types::StreamEvent;

    /// Minimal test harness.
    struct FakeHarness {
        harness_name: String,
    }

    impl FakeHarness {
        fn new(name: &str) -> Self {
            Self {
                harness_name: name.to_string(),
            }
        }
    }

    struct NullDecoder;

    impl StreamDecoder for NullDecoder {
        fn decode_value(&mut self, _value: &serde_json::Value) -> Vec<StreamEvent> {
            Vec::new()
        }
    }

    impl Harness for FakeHarness {
        fn name(&self) -> &str {
            &self.harness_name
        }

        fn binary(&self) -> &str {
            "true"
        }

        fn build_args(&self, _invocation: &Invocation<'_>) -> Vec<String> {
            Vec::new()
        }

        fn decoder(&self) -> Box<dyn StreamDecoder> {
            Box::new(NullDecoder)
        }
    }

    #[test]
    fn registry_starts_empty() {
        let registry = HarnessRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn register_and_get() {
        let mut registry = HarnessRegistry::new();
        let old = registry.register(FakeHarness::new("alpha"));
        assert!(old.is_none());

        let harness = registry.get("alpha");
        assert!(harness.is_some());
        assert_eq!(harness.unwrap().name(), "alpha");
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = HarnessRegistry::new();
        registry.register(FakeHarness::new("alpha"));
        let old = registry.register(FakeHarness::new("alpha"));
        assert!(old.is_some());
        assert_eq!(old.unwrap().name(), "alpha");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let registry = HarnessRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn list_is_sorted() {
        let mut registry = HarnessRegistry::new();
        registry.register(FakeHarness::new("gamma"));
        registry.register(FakeHarness::new("alpha"));
        registry.register(FakeHarness::new("beta"));
        assert_eq!(registry.list(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn defaults_register_all_backends_with_configured_binaries() {
        let config = RelayConfig::new("/tmp")
            .with_claude_binary("/opt/bin/claude")
            .with_gemini_binary("/opt/bin/gemini");
        let registry = HarnessRegistry::with_defaults(&config);
        assert_eq!(registry.list(), vec!["claude", "gemini", "opencode"]);
        assert_eq!(registry.get("claude").unwrap().binary(), "/opt/bin/claude");
        assert_eq!(registry.get("gemini").unwrap().binary(), "/opt/bin/gemini");
        assert_eq!(registry.get("opencode").unwrap().binary(), "opencode");
        assert_eq!(registry.get("claude").unwrap().default_tools().len(), 8);
    }

    #[test]
    fn registry_debug_shows_names() {
        let mut registry = HarnessRegistry::new();
        registry.register(FakeHarness::new("test-harness"));
        let debug = format!("{registry:?}");
        assert!(debug.contains("test-harness"));
    }
}
