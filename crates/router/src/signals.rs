//! Domain signals extracted from a task request.
//!
//! The description and every tag go through the same
//! [`tokenize`](switchyard_core::tokenize), and a tag matches when its
//! tokens appear contiguously in the description.

use switchyard_core::{TaskRequest, normalize_key, tokenize};

/// Tokens and hints of one request, ready for matching against tags.
#[derive(Debug, Clone)]
pub struct RequestSignals {
    tokens: Vec<String>,
    hint_phrases: Vec<Vec<String>>,
    hint_keys: Vec<String>,
}

impl RequestSignals {
    pub fn extract(request: &TaskRequest) -> Self {
        Self {
            tokens: tokenize(request.description()),
            hint_phrases: request.hints().iter().map(|h| tokenize(h)).collect(),
            hint_keys: request.hints().iter().map(|h| normalize_key(h)).collect(),
        }
    }

    /// Whether the request signals `tag`, either through a hint naming it
    /// or through its tokens appearing contiguously in the description.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let phrase = tokenize(tag);
        if phrase.is_empty() {
            return false;
        }
        if self.hint_phrases.iter().any(|h| *h == phrase) {
            return true;
        }
        self.tokens
            .windows(phrase.len())
            .any(|window| window == phrase.as_slice())
    }

    /// Whether a hint names the profile identifier itself.
    pub fn names_profile(&self, id: &str) -> bool {
        let key = normalize_key(id);
        self.hint_keys.iter().any(|h| *h == key)
    }
}
