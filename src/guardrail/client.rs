//! Semantic guardrail REST client

use super::types::{GuardrailResult, Message, Outcome};
use crate::config::GuardrailConfig;
use crate::error::{Error, Result, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    messages: Vec<Verdict>,
    #[serde(default)]
    conversation: Option<Verdict>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    outcome: Option<String>,
    score: f64,
    #[serde(default)]
    processors: Vec<ProcessorVerdict>,
}

#[derive(Debug, Deserialize)]
struct ProcessorVerdict {
    name: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Scores a raw prompt for risk
#[async_trait]
pub trait PromptScorer: Send + Sync {
    async fn score_prompt(&self, prompt: &str) -> Result<GuardrailResult>;
}

/// Client for the conversation scan endpoint.
///
/// One attempt per call, no retry. Safe to share; the only state is the
/// pooled HTTP connection.
pub struct GuardrailClient {
    url: String,
    processors: Vec<String>,
    client: reqwest::Client,
}

impl GuardrailClient {
    /// Create a client with the configured timeout
    pub fn new(config: &GuardrailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build guardrail HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            processors: config.processors.clone(),
            client,
        })
    }

    /// Score a single-turn user prompt with the configured processors
    pub async fn score_prompt(&self, prompt: &str) -> Result<GuardrailResult> {
        self.score(&[Message::user(prompt, self.processors.clone())])
            .await
    }

    /// Score a conversation
    pub async fn score(&self, conversation: &[Message]) -> Result<GuardrailResult> {
        if conversation.is_empty() {
            return Err(Error::Config(
                "guardrail conversation must contain at least one message".to_string(),
            ));
        }

        tracing::debug!(
            messages = conversation.len(),
            "Submitting conversation to semantic guardrail"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&ScanRequest {
                messages: conversation,
            })
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

        let result = parse_scan_response(&body)
            .map_err(|reason| ServiceError::malformed(&self.url, status.as_u16(), reason))?;

        tracing::info!(
            outcome = %result.outcome,
            score = result.score,
            "Semantic guardrail result"
        );
        Ok(result)
    }
}

/// Map the scan response; the error string describes what was malformed
fn parse_scan_response(body: &str) -> std::result::Result<GuardrailResult, String> {
    let parsed: ScanResponse =
        serde_json::from_str(body).map_err(|e| format!("{}: {}", e, body))?;

    let per_message_scores: Vec<f64> = parsed.messages.iter().map(|m| m.score).collect();
    if let Some(bad) = per_message_scores
        .iter()
        .find(|s| !(0.0..=1.0).contains(*s))
    {
        return Err(format!("message score {} is outside [0, 1]", bad));
    }

    let verdict = parsed
        .conversation
        .as_ref()
        .or_else(|| parsed.messages.first())
        .ok_or_else(|| "response contains neither messages nor conversation".to_string())?;

    if !(0.0..=1.0).contains(&verdict.score) {
        return Err(format!("score {} is outside [0, 1]", verdict.score));
    }

    // Conversation verdicts may omit processors; fall back to the first message's
    let processors = if verdict.processors.is_empty() {
        parsed
            .messages
            .first()
            .map(|m| m.processors.as_slice())
            .unwrap_or_default()
    } else {
        verdict.processors.as_slice()
    };

    let explanation = if processors.is_empty() {
        None
    } else {
        Some(
            processors
                .iter()
                .map(|p| match (&p.explanation, p.score) {
                    (Some(e), _) => format!("{}: {}", p.name, e),
                    (None, Some(s)) => format!("{}: {}", p.name, s),
                    (None, None) => p.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    Ok(GuardrailResult {
        score: verdict.score,
        outcome: verdict
            .outcome
            .clone()
            .map(Outcome::from)
            .unwrap_or(Outcome::Accepted),
        explanation,
        per_message_scores,
    })
}

#[async_trait]
impl PromptScorer for GuardrailClient {
    async fn score_prompt(&self, prompt: &str) -> Result<GuardrailResult> {
        GuardrailClient::score_prompt(self, prompt).await
    }
}
