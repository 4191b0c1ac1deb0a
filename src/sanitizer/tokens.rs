//! Protected-token format: `[LABEL]token[/LABEL]`

use crate::error::{Error, Result};
use regex::Regex;

/// A protected value found in text
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    /// Byte offset of the opening tag
    pub start: usize,
    /// Byte offset just past the closing tag
    pub end: usize,
    pub label: String,
    pub payload: String,
}

/// Wrap a protected token in its label tags
pub fn wrap(label: &str, token: &str) -> String {
    format!("[{}]{}[/{}]", label, token, label)
}

/// Finds well-formed tagged values in a line
pub struct TokenScanner {
    pattern: Regex,
}

impl TokenScanner {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"\[([A-Z0-9_]+)\](.*?)\[/([A-Z0-9_]+)\]")
            .map_err(|e| Error::Config(format!("Invalid token pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Tagged values in order of appearance; mismatched tag pairs are ignored
    pub fn scan(&self, text: &str) -> Vec<TaggedValue> {
        self.pattern
            .captures_iter(text)
            .filter(|caps| caps[1] == caps[3])
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(TaggedValue {
                    start: whole.start(),
                    end: whole.end(),
                    label: caps[1].to_string(),
                    payload: caps[2].to_string(),
                })
            })
            .collect()
    }
}
