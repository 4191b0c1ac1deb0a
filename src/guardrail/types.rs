//! Guardrail request and result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One conversation message submitted for scanning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub content: String,
    pub processors: Vec<String>,
}

impl Message {
    /// A user → ai message
    pub fn user(content: impl Into<String>, processors: Vec<String>) -> Self {
        Self {
            from: "user".to_string(),
            to: "ai".to_string(),
            content: content.into(),
            processors,
        }
    }
}

/// Guardrail verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Approved,
    Accepted,
    Rejected,
    Risk,
    Malicious,
    OffTopic,
    /// Any outcome string this crate does not know
    Other(String),
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Approved => "approved",
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
            Outcome::Risk => "risk",
            Outcome::Malicious => "malicious",
            Outcome::OffTopic => "off-topic",
            Outcome::Other(s) => s,
        }
    }
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        match s.to_lowercase().replace('_', "-").as_str() {
            "approved" => Outcome::Approved,
            "accepted" => Outcome::Accepted,
            "rejected" => Outcome::Rejected,
            "risk" => Outcome::Risk,
            "malicious" => Outcome::Malicious,
            "off-topic" | "offtopic" => Outcome::OffTopic,
            _ => Outcome::Other(s),
        }
    }
}

impl From<Outcome> for String {
    fn from(o: Outcome) -> Self {
        o.as_str().to_string()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured score for one guardrail call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// Risk score in [0, 1]; higher is riskier
    pub score: f64,
    pub outcome: Outcome,
    pub explanation: Option<String>,
    /// Message-level scores in conversation order
    pub per_message_scores: Vec<f64>,
}

impl GuardrailResult {
    /// Whether the prompt should be treated as rejected
    pub fn is_rejected(&self, threshold: f64) -> bool {
        matches!(self.outcome, Outcome::Rejected | Outcome::Malicious) || self.score > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parsing() {
        assert_eq!(Outcome::from("Approved".to_string()), Outcome::Approved);
        assert_eq!(Outcome::from("off_topic".to_string()), Outcome::OffTopic);
        assert_eq!(
            Outcome::from("quarantined".to_string()),
            Outcome::Other("quarantined".to_string())
        );
    }

    #[test]
    fn test_outcome_serializes_as_string() {
        let json = serde_json::to_string(&Outcome::OffTopic).unwrap();
        assert_eq!(json, "\"off-topic\"");
        let back: Outcome = serde_json::from_str("\"malicious\"").unwrap();
        assert_eq!(back, Outcome::Malicious);
    }

    #[test]
    fn test_is_rejected() {
        let mut result = GuardrailResult {
            score: 0.2,
            outcome: Outcome::Accepted,
            explanation: None,
            per_message_scores: vec![0.2],
        };
        assert!(!result.is_rejected(0.6));

        result.score = 0.7;
        assert!(result.is_rejected(0.6));

        result.score = 0.1;
        result.outcome = Outcome::Malicious;
        assert!(result.is_rejected(0.6));
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("hello", vec!["pii".to_string()]);
        assert_eq!(msg.from, "user");
        assert_eq!(msg.to, "ai");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["processors"][0], "pii");
    }
}
