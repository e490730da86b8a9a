use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-delivery identifier for a question.
///
/// A fresh id is minted every time a question is handed to a session, even
/// when the underlying content is reused from the cache, so no two displayed
/// instances ever share identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Mints a new unique delivery id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable content identity for stored questions.
///
/// Derived from the subject and the normalized prompt text, so re-generating
/// or re-importing the same question upserts in place instead of duplicating.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(String);

/// Cap on normalized prompt length inside a key. Long prompts rarely differ
/// past this point and unbounded keys bloat the primary key index.
const MAX_KEY_CHARS: usize = 160;

impl ContentKey {
    /// Derives the stable key for a prompt within a subject.
    #[must_use]
    pub fn derive(subject: &str, prompt: &str) -> Self {
        let normalized: String = prompt
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
            .chars()
            .take(MAX_KEY_CHARS)
            .collect();
        Self(format!("{subject}:{normalized}"))
    }

    /// Wraps an already-derived key, e.g. one read back from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
