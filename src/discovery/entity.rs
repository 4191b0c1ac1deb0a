//! Detected entity spans and label resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One detected sensitive occurrence within a single line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Start byte offset in the line
    pub start: usize,
    /// End byte offset in the line (exclusive)
    pub end: usize,
    /// Raw detector type, e.g. `SOCIAL_SECURITY_NUMBER`
    pub entity_type: String,
    /// Resolved label used for protected tokens, e.g. `SSN`
    pub label: String,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
    /// The spanned text
    pub original_text: String,
}

impl EntitySpan {
    /// Number of characters covered by the span
    pub fn char_len(&self) -> usize {
        self.original_text.chars().count()
    }
}

/// Detector type → label map
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    labels: BTreeMap<String, String>,
}

impl EntityMap {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// Resolve a detector type to its label.
    ///
    /// Pipe-joined types (`"PERSON|LOCATION"`) resolve to the first
    /// candidate present in the map, or the first candidate verbatim.
    pub fn resolve(&self, raw: &str) -> String {
        if let Some(label) = self.labels.get(raw) {
            return label.clone();
        }

        let candidates: Vec<&str> = raw
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        candidates
            .iter()
            .find_map(|c| self.labels.get(*c).cloned())
            .or_else(|| candidates.first().map(|c| c.to_string()))
            .unwrap_or_else(|| raw.to_string())
    }
}
