//! Language profiles and the static language registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The immutable pairing of a runtime image and entry-file name for one
/// supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LanguageProfile {
    /// Container image that knows how to run the entry file.
    pub image: String,

    /// File name the image expects the submission under (e.g. `script.py`).
    pub entry_file: String,
}

impl LanguageProfile {
    /// Create a profile from an image reference and entry-file name.
    #[must_use]
    pub fn new(image: impl Into<String>, entry_file: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            entry_file: entry_file.into(),
        }
    }
}

/// Read-only mapping from language identifier to [`LanguageProfile`].
///
/// Built once at process start and shared by reference across concurrent
/// executions. It is never mutated afterward, so lookups need no
/// synchronization.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageRegistry {
    /// Registry with the built-in profiles: a dynamic-scripting language
    /// (python), a general-purpose interpreted language (javascript) and
    /// a compiled language (java).
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_profiles([
            (
                "python",
                LanguageProfile::new("dukunuu/python-executor:latest", "script.py"),
            ),
            (
                "javascript",
                LanguageProfile::new("dukunuu/js-executor:latest", "script.js"),
            ),
            (
                "java",
                LanguageProfile::new("dukunuu/java-executor:latest", "Main.java"),
            ),
        ])
    }

    /// Build a registry from an explicit profile table.
    ///
    /// Identifiers are normalized the same way [`lookup`](Self::lookup)
    /// normalizes its argument, so the table may use any casing.
    #[must_use]
    pub fn from_profiles<I, S>(profiles: I) -> Self
    where
        I: IntoIterator<Item = (S, LanguageProfile)>,
        S: AsRef<str>,
    {
        Self {
            profiles: profiles
                .into_iter()
                .map(|(id, profile)| (normalize(id.as_ref()), profile))
                .collect(),
        }
    }

    /// Look up the profile for a language identifier.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn lookup(&self, language_id: &str) -> Option<&LanguageProfile> {
        self.profiles.get(&normalize(language_id))
    }

    /// Normalized identifiers of all supported languages.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(language_id: &str) -> String {
    language_id.trim().to_lowercase()
}
