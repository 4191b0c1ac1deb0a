//! Text sanitization: protect, unprotect and redact
//!
//! Every transform works line by line. Blank lines pass through untouched
//! and are never sent to discovery. Spans are spliced in descending
//! start-offset order so earlier replacements do not shift later offsets.
//!
//! There is no fallback between transforms: a failed protect is returned
//! as a failure, never replaced by a redaction.

pub mod lines;
pub mod tokens;

use crate::config::{ProtectionConfig, RedactMethod, SanitizationConfig};
use crate::discovery::{DiscoveryClient, EntitySpan};
use crate::error::{Error, ErrorDetail, Result};
use crate::pipeline::ExecutionMode;
use crate::protection::{ProtectionSdk, ProtectionSession};
use lines::{is_blank, split_lines};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokens::{wrap, TaggedValue, TokenScanner};
use tokio::sync::OnceCell;

/// Sanitization policy applied to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Reversible tokenization of discovered spans
    Protect,
    /// Reverse tokens previously produced by `Protect`
    Unprotect,
    /// Irreversible masking or removal of discovered spans
    Redact,
}

/// One line with the spans discovered in it
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLine {
    pub content: String,
    pub terminator: String,
    pub spans: Vec<EntitySpan>,
}

/// Text split into lines with discovery results attached.
///
/// Produced once per run; every later transform reuses these spans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredText {
    pub lines: Vec<DiscoveredLine>,
}

impl DiscoveredText {
    /// Lines of `text` with no spans attached
    pub fn undiscovered(text: &str) -> Self {
        Self {
            lines: split_lines(text)
                .into_iter()
                .map(|(content, terminator)| DiscoveredLine {
                    content: content.to_string(),
                    terminator: terminator.to_string(),
                    spans: Vec::new(),
                })
                .collect(),
        }
    }

    /// All spans in line order
    pub fn entities(&self) -> Vec<EntitySpan> {
        self.lines
            .iter()
            .flat_map(|l| l.spans.iter().cloned())
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.lines.iter().map(|l| l.spans.len()).sum()
    }
}

/// One protected line and the tokens protect placed in it
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedLine {
    pub content: String,
    pub terminator: String,
    pub tokens: Vec<TaggedValue>,
}

/// Output of protect, keeping every produced token's position.
///
/// Unprotecting through these positions leaves tag-shaped text that was
/// already in the input alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectedText {
    pub lines: Vec<ProtectedLine>,
}

impl ProtectedText {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .flat_map(|l| [l.content.as_str(), l.terminator.as_str()])
            .collect()
    }

    pub fn token_count(&self) -> usize {
        self.lines.iter().map(|l| l.tokens.len()).sum()
    }
}

/// Aggregated outcome of one sanitize operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizationResult {
    pub mode: ExecutionMode,
    pub protected_text: Option<String>,
    pub redacted_text: Option<String>,
    pub unprotected_text: Option<String>,
    pub entities: Vec<EntitySpan>,
    pub sanitize_error: Option<ErrorDetail>,
}

impl SanitizationResult {
    pub fn empty(mode: ExecutionMode) -> Self {
        Self {
            mode,
            protected_text: None,
            redacted_text: None,
            unprotected_text: None,
            entities: Vec::new(),
            sanitize_error: None,
        }
    }
}

/// Mask or remove spans. Pure and deterministic.
pub fn redact_line(line: &str, spans: &[EntitySpan], method: RedactMethod, mask: char) -> String {
    let replacements = spans
        .iter()
        .map(|s| {
            let replacement = match method {
                RedactMethod::Mask => mask.to_string().repeat(s.char_len()),
                RedactMethod::Redact => String::new(),
            };
            (s.start, s.end, replacement)
        })
        .collect();
    splice(line, replacements)
}

/// Replace byte ranges, last range first
fn splice(line: &str, mut replacements: Vec<(usize, usize, String)>) -> String {
    replacements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut result = line.to_string();
    for (start, end, replacement) in replacements {
        result.replace_range(start..end, &replacement);
    }
    result
}

/// Applies transforms to text using discovered entity spans
pub struct Sanitizer {
    discovery: Arc<DiscoveryClient>,
    protector: Option<Arc<dyn ProtectionSdk>>,
    sanitization: SanitizationConfig,
    protection: ProtectionConfig,
    scanner: TokenScanner,
    session: OnceCell<Box<dyn ProtectionSession>>,
}

impl Sanitizer {
    /// Create a sanitizer; `protector` is `None` when no credentials exist
    pub fn new(
        discovery: Arc<DiscoveryClient>,
        protector: Option<Arc<dyn ProtectionSdk>>,
        sanitization: SanitizationConfig,
        protection: ProtectionConfig,
    ) -> Result<Self> {
        Ok(Self {
            discovery,
            protector,
            sanitization,
            protection,
            scanner: TokenScanner::new()?,
            session: OnceCell::new(),
        })
    }

    /// Whether protect/unprotect can run at all
    pub fn can_protect(&self) -> bool {
        self.protector.is_some()
    }

    /// Discover spans for every non-blank line of `text`
    pub async fn discover_text(&self, text: &str) -> Result<DiscoveredText> {
        let mut discovered = DiscoveredText::undiscovered(text);
        for line in discovered.lines.iter_mut() {
            if !is_blank(&line.content) {
                line.spans = self.discovery.discover(&line.content).await?;
            }
        }
        tracing::debug!(
            lines = discovered.lines.len(),
            entities = discovered.entity_count(),
            "Discovered entities"
        );
        Ok(discovered)
    }

    /// Apply `transform` to already discovered text, stopping at the first error
    pub async fn apply(&self, discovered: &DiscoveredText, transform: Transform) -> Result<String> {
        let mut output = String::new();
        for line in &discovered.lines {
            if is_blank(&line.content) {
                output.push_str(&line.content);
            } else {
                let sanitized = self
                    .transform_line(&line.content, &line.spans, transform)
                    .await?;
                output.push_str(&sanitized);
            }
            output.push_str(&line.terminator);
        }
        Ok(output)
    }

    /// Protect every discovered span, recording where each token landed
    pub async fn protect(&self, discovered: &DiscoveredText) -> Result<ProtectedText> {
        let mut protected = ProtectedText::default();
        for line in &discovered.lines {
            let (content, tokens) = if is_blank(&line.content) {
                (line.content.clone(), Vec::new())
            } else {
                self.protect_line(&line.content, &line.spans).await?
            };
            protected.lines.push(ProtectedLine {
                content,
                terminator: line.terminator.clone(),
                tokens,
            });
        }
        Ok(protected)
    }

    /// Reverse exactly the tokens produced by [`protect`](Self::protect)
    pub async fn unprotect(&self, protected: &ProtectedText) -> Result<String> {
        let mut output = String::new();
        for line in &protected.lines {
            let restored = self.unprotect_values(&line.content, &line.tokens).await?;
            output.push_str(&restored);
            output.push_str(&line.terminator);
        }
        Ok(output)
    }

    /// Sanitize one line.
    ///
    /// On error the returned line is the unmodified input and must not be
    /// shown alongside the error.
    pub async fn process_line(&self, line: &str, transform: Transform) -> (String, Option<Error>) {
        let (output, _, error) = self.process_line_with_spans(line, transform).await;
        (output, error)
    }

    async fn process_line_with_spans(
        &self,
        line: &str,
        transform: Transform,
    ) -> (String, Vec<EntitySpan>, Option<Error>) {
        if is_blank(line) {
            return (line.to_string(), Vec::new(), None);
        }

        let spans = match transform {
            Transform::Unprotect => Vec::new(),
            Transform::Protect | Transform::Redact => match self.discovery.discover(line).await {
                Ok(spans) => spans,
                Err(e) => return (line.to_string(), Vec::new(), Some(e)),
            },
        };

        match self.transform_line(line, &spans, transform).await {
            Ok(output) => (output, spans, None),
            Err(e) => (line.to_string(), spans, Some(e)),
        }
    }

    /// Sanitize a whole text line by line.
    ///
    /// Processing stops at the first error; the output text is withheld
    /// whenever an error was recorded.
    pub async fn process_text(&self, text: &str, transform: Transform) -> SanitizationResult {
        let mode = match transform {
            Transform::Protect | Transform::Unprotect => ExecutionMode::ProtectUnprotect,
            Transform::Redact => ExecutionMode::RedactOnly,
        };
        let mut result = SanitizationResult::empty(mode);
        let mut output = String::with_capacity(text.len());

        for (content, terminator) in split_lines(text) {
            let (line, spans, error) = self.process_line_with_spans(content, transform).await;
            result.entities.extend(spans);
            if let Some(e) = error {
                tracing::error!(transform = ?transform, error = %e, "Sanitization failed");
                result.sanitize_error = Some(ErrorDetail::from(e));
                return result;
            }
            output.push_str(&line);
            output.push_str(terminator);
        }

        match transform {
            Transform::Protect => result.protected_text = Some(output),
            Transform::Unprotect => result.unprotected_text = Some(output),
            Transform::Redact => result.redacted_text = Some(output),
        }
        result
    }

    async fn transform_line(
        &self,
        line: &str,
        spans: &[EntitySpan],
        transform: Transform,
    ) -> Result<String> {
        match transform {
            Transform::Redact => Ok(redact_line(
                line,
                spans,
                self.sanitization.redact_method,
                self.sanitization.mask_char(),
            )),
            Transform::Protect => Ok(self.protect_line(line, spans).await?.0),
            Transform::Unprotect => {
                let tagged = self.scanner.scan(line);
                self.unprotect_values(line, &tagged).await
            }
        }
    }

    async fn protect_line(
        &self,
        line: &str,
        spans: &[EntitySpan],
    ) -> Result<(String, Vec<TaggedValue>)> {
        if spans.is_empty() {
            return Ok((line.to_string(), Vec::new()));
        }
        let session = self.session().await?;

        let mut tokens = Vec::with_capacity(spans.len());
        let mut unchanged = 0;
        for span in spans.iter().rev() {
            let data_element = self.protection.data_element_for(&span.label);
            let token = session.protect(&data_element, &span.original_text).await?;
            if token == span.original_text {
                unchanged += 1;
            }
            tokens.push((span, token));
        }

        if unchanged == spans.len() {
            tracing::warn!(
                entities = spans.len(),
                "Protection returned every value unchanged"
            );
            return Err(Error::SilentFailure {
                entities: spans.len(),
            });
        }

        // Output offsets shift by the growth of every earlier replacement
        tokens.sort_by_key(|(span, _)| span.start);
        let mut replacements = Vec::with_capacity(tokens.len());
        let mut tagged = Vec::with_capacity(tokens.len());
        let (mut added, mut removed) = (0, 0);
        for (span, token) in tokens {
            let wrapped = wrap(&span.label, &token);
            let start = span.start + added - removed;
            tagged.push(TaggedValue {
                start,
                end: start + wrapped.len(),
                label: span.label.clone(),
                payload: token,
            });
            added += wrapped.len();
            removed += span.end - span.start;
            replacements.push((span.start, span.end, wrapped));
        }
        Ok((splice(line, replacements), tagged))
    }

    async fn unprotect_values(&self, line: &str, tagged: &[TaggedValue]) -> Result<String> {
        if tagged.is_empty() {
            return Ok(line.to_string());
        }
        let session = self.session().await?;

        let mut replacements = Vec::with_capacity(tagged.len());
        let mut unchanged = 0;
        for value in tagged.iter().rev() {
            let data_element = self.protection.data_element_for(&value.label);
            let restored = session.unprotect(&data_element, &value.payload).await?;
            if restored == value.payload {
                unchanged += 1;
            }
            replacements.push((value.start, value.end, restored));
        }

        if unchanged == tagged.len() {
            tracing::warn!(
                entities = tagged.len(),
                "Unprotect returned every token unchanged"
            );
            return Err(Error::SilentFailure {
                entities: tagged.len(),
            });
        }
        Ok(splice(line, replacements))
    }

    async fn session(&self) -> Result<&dyn ProtectionSession> {
        let sdk = self
            .protector
            .as_ref()
            .ok_or_else(|| Error::protection("no protection credentials configured"))?;

        let session = self
            .session
            .get_or_try_init(|| async {
                tracing::debug!(sdk = sdk.name(), "Creating protection session");
                sdk.create_session(&self.protection.policy_user).await
            })
            .await?;
        Ok(&**session)
    }
}
