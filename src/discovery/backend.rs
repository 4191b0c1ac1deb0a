//! Pluggable classification backend
//!
//! A [`ClassifierBackend`] returns raw, unvalidated classifications. The
//! [`DiscoveryClient`](super::DiscoveryClient) owns validation, threshold
//! filtering and label resolution, so every backend gets the same checks.
//!
//! ```text
//! line → [ClassifierBackend] → raw classifications (char offsets)
//!                                   ↓
//!          validate → threshold → byte offsets → dedupe → EntitySpan
//! ```

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result, ServiceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// A classification as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    /// Detector type, possibly pipe-joined
    pub entity_type: String,
    /// Start character offset
    pub start: usize,
    /// End character offset (exclusive)
    pub end: usize,
    /// Confidence score
    pub score: f64,
}

/// Pluggable classification backend interface.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Classify text and return every classification found.
    async fn classify(&self, text: &str) -> Result<Vec<RawClassification>>;

    /// Human-readable name for this backend (used in logs).
    fn name(&self) -> &str;
}

/// Wire shape of the Data Discovery classify response
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classifications: BTreeMap<String, Vec<WireClassification>>,
}

#[derive(Debug, Deserialize)]
struct WireClassification {
    score: f64,
    location: WireLocation,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    start_index: usize,
    end_index: usize,
}

/// Data Discovery REST backend.
///
/// Posts each text as `text/plain` with the score threshold as a query
/// parameter.
pub struct HttpClassifier {
    url: String,
    score_threshold: f64,
    client: reqwest::Client,
}

impl HttpClassifier {
    /// Create a backend with the configured timeout
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build discovery HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            score_threshold: config.score_threshold,
            client,
        })
    }
}

#[async_trait]
impl ClassifierBackend for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<RawClassification>> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("score_threshold", self.score_threshold)])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(&self.url, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::from_transport(&self.url, &e))?;

        if !status.is_success() {
            return Err(ServiceError::status(&self.url, status.as_u16(), body).into());
        }

        parse_classify_response(&body)
    }

    fn name(&self) -> &str {
        "data-discovery"
    }
}

/// Flatten a classify response body into raw classifications
fn parse_classify_response(body: &str) -> Result<Vec<RawClassification>> {
    let parsed: ClassifyResponse = serde_json::from_str(body)
        .map_err(|e| Error::Discovery(format!("Failed to parse classify response: {}", e)))?;

    Ok(parsed
        .classifications
        .into_iter()
        .flat_map(|(entity_type, entries)| {
            entries.into_iter().map(move |c| RawClassification {
                entity_type: entity_type.clone(),
                start: c.location.start_index,
                end: c.location.end_index,
                score: c.score,
            })
        })
        .collect())
}
