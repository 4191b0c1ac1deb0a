//! Discovery client: validated, threshold-filtered entity spans

use super::backend::{ClassifierBackend, RawClassification};
use super::entity::{EntityMap, EntitySpan};
use crate::error::{Error, Result};

/// Discovers sensitive entities in a single line of text.
///
/// All-or-nothing: one invalid classification fails the whole call, a
/// partial span list is never returned.
pub struct DiscoveryClient {
    backend: Box<dyn ClassifierBackend>,
    score_threshold: f64,
    entity_map: EntityMap,
}

impl DiscoveryClient {
    pub fn new(
        backend: Box<dyn ClassifierBackend>,
        score_threshold: f64,
        entity_map: EntityMap,
    ) -> Self {
        Self {
            backend,
            score_threshold,
            entity_map,
        }
    }

    /// Discover entities in `text`, ordered by start offset
    pub async fn discover(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let raw = self.backend.classify(text).await?;
        let total = raw.len();

        // char index → byte offset; the extra entry maps end-of-text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut spans = Vec::with_capacity(total);
        for classification in raw {
            validate(&classification, char_len)?;
            if classification.score < self.score_threshold {
                continue;
            }
            let start = boundaries[classification.start];
            let end = boundaries[classification.end];
            spans.push(EntitySpan {
                start,
                end,
                label: self.entity_map.resolve(&classification.entity_type),
                entity_type: classification.entity_type,
                confidence: classification.score,
                original_text: text[start..end].to_string(),
            });
        }

        let spans = deduplicate_spans(spans);
        tracing::debug!(
            backend = self.backend.name(),
            received = total,
            kept = spans.len(),
            "Discovery complete"
        );
        Ok(spans)
    }
}

fn validate(c: &RawClassification, char_len: usize) -> Result<()> {
    if c.start >= c.end || c.end > char_len {
        return Err(Error::Discovery(format!(
            "{} span {}..{} is out of bounds for text of {} characters",
            c.entity_type, c.start, c.end, char_len
        )));
    }
    if !c.score.is_finite() || !(0.0..=1.0).contains(&c.score) {
        return Err(Error::Discovery(format!(
            "{} confidence {} is outside [0, 1]",
            c.entity_type, c.score
        )));
    }
    Ok(())
}

/// Deduplicate overlapping spans by keeping the highest-confidence one.
///
/// Output is ordered by start offset.
fn deduplicate_spans(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    if spans.len() <= 1 {
        return spans;
    }

    spans.sort_by(|a, b| {
        a.start.cmp(&b.start).then(
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let mut result: Vec<EntitySpan> = Vec::new();
    for span in spans {
        if let Some(last) = result.last() {
            if span.start < last.end {
                if span.confidence > last.confidence {
                    result.pop();
                    result.push(span);
                }
                continue;
            }
        }
        result.push(span);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_entity_map;
    use async_trait::async_trait;

    /// Backend returning a fixed classification list per call
    struct StaticBackend {
        responses: Vec<RawClassification>,
    }

    #[async_trait]
    impl ClassifierBackend for StaticBackend {
        async fn classify(&self, _text: &str) -> Result<Vec<RawClassification>> {
            Ok(self.responses.clone())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn raw(entity_type: &str, start: usize, end: usize, score: f64) -> RawClassification {
        RawClassification {
            entity_type: entity_type.to_string(),
            start,
            end,
            score,
        }
    }

    fn client(responses: Vec<RawClassification>) -> DiscoveryClient {
        DiscoveryClient::new(
            Box::new(StaticBackend { responses }),
            0.6,
            EntityMap::new(default_entity_map()),
        )
    }

    #[tokio::test]
    async fn test_discover_resolves_labels_and_text() {
        let client = client(vec![
            raw("CITY", 20, 28, 0.85),
            raw("PERSON", 0, 10, 0.9),
        ]);
        let spans = client
            .discover("John Smith lives in Stamford.")
            .await
            .unwrap();

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].entity_type, "PERSON");
        assert_eq!(spans[0].original_text, "John Smith");
        assert_eq!(spans[1].label, "CITY");
        assert_eq!(spans[1].original_text, "Stamford");
    }

    #[tokio::test]
    async fn test_discover_filters_below_threshold() {
        let client = client(vec![raw("PERSON", 0, 4, 0.3), raw("CITY", 20, 28, 0.6)]);
        let spans = client
            .discover("John Smith lives in Stamford.")
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].entity_type, "CITY");
    }

    #[tokio::test]
    async fn test_discover_rejects_out_of_bounds_span() {
        let client = client(vec![raw("PERSON", 0, 4, 0.9), raw("CITY", 20, 99, 0.9)]);
        let err = client.discover("John lives here").await.unwrap_err();
        assert_eq!(err.kind(), "discovery_error");
    }

    #[tokio::test]
    async fn test_discover_rejects_inverted_span() {
        let client = client(vec![raw("PERSON", 4, 4, 0.9)]);
        assert!(client.discover("John lives here").await.is_err());
    }

    #[tokio::test]
    async fn test_discover_rejects_bad_confidence() {
        let client = client(vec![raw("PERSON", 0, 4, 1.2)]);
        assert!(client.discover("John lives here").await.is_err());

        let client = client_with_nan();
        assert!(client.discover("John lives here").await.is_err());
    }

    fn client_with_nan() -> DiscoveryClient {
        client(vec![raw("PERSON", 0, 4, f64::NAN)])
    }

    #[tokio::test]
    async fn test_discover_converts_char_offsets_to_bytes() {
        // "Zürich" is 6 chars but 7 bytes
        let client = client(vec![raw("CITY", 8, 14, 0.9)]);
        let text = "I'm in  Zürich now";
        let spans = client.discover(text).await.unwrap();
        assert_eq!(spans[0].original_text, "Zürich");
        assert_eq!(&text[spans[0].start..spans[0].end], "Zürich");
    }

    #[test]
    fn test_deduplicate_overlap_keeps_higher_confidence() {
        let span = |start, end, confidence, entity_type: &str| EntitySpan {
            start,
            end,
            entity_type: entity_type.to_string(),
            label: entity_type.to_string(),
            confidence,
            original_text: String::new(),
        };
        let result = deduplicate_spans(vec![
            span(10, 21, 0.7, "PHONE_NUMBER"),
            span(10, 21, 0.95, "SOCIAL_SECURITY_NUMBER"),
            span(30, 35, 0.8, "CITY"),
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].entity_type, "SOCIAL_SECURITY_NUMBER");
        assert_eq!(result[1].entity_type, "CITY");
    }
}
