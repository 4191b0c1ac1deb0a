//! Step and pipeline results

use super::mode::{ExecutionMode, StepName};
use crate::discovery::EntitySpan;
use crate::error::ErrorDetail;
use crate::guardrail::GuardrailResult;
use crate::sanitizer::SanitizationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Skipped,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Skipped => write!(f, "skipped"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Data produced by a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepPayload {
    Guardrail(GuardrailResult),
    Entities(Vec<EntitySpan>),
    Text(String),
}

/// Outcome of one step in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: StepName,
    /// 1-based position within the active mode
    pub step_number: usize,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StepPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl StepResult {
    pub fn success(step_name: StepName, step_number: usize, payload: StepPayload) -> Self {
        Self {
            step_name,
            step_number,
            status: StepStatus::Success,
            payload: Some(payload),
            error: None,
        }
    }

    /// Failed steps never carry a payload
    pub fn failed(step_name: StepName, step_number: usize, error: ErrorDetail) -> Self {
        Self {
            step_name,
            step_number,
            status: StepStatus::Failed,
            payload: None,
            error: Some(error),
        }
    }

    pub fn skipped(step_name: StepName, step_number: usize, reason: Option<ErrorDetail>) -> Self {
        Self {
            step_name,
            step_number,
            status: StepStatus::Skipped,
            payload: None,
            error: reason,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Some(StepPayload::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub mode: ExecutionMode,
    pub steps: Vec<StepResult>,
    pub sanitization: SanitizationResult,
}

impl PipelineResult {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            mode,
            steps: Vec::with_capacity(mode.steps().len()),
            sanitization: SanitizationResult::empty(mode),
        }
    }

    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// No step failed
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.status != StepStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_step_has_no_payload() {
        let step = StepResult::failed(
            StepName::Protect,
            2,
            ErrorDetail::new("protection_error", "login rejected"),
        );
        assert!(step.payload.is_none());
        assert!(step.text().is_none());
        assert_eq!(step.status, StepStatus::Failed);
    }

    #[test]
    fn test_is_success_ignores_skipped() {
        let mut result = PipelineResult::new(ExecutionMode::RedactOnly);
        result.steps.push(StepResult::success(
            StepName::Discover,
            1,
            StepPayload::Entities(vec![]),
        ));
        result
            .steps
            .push(StepResult::skipped(StepName::Redact, 2, None));
        assert!(result.is_success());

        result.steps[1] = StepResult::failed(
            StepName::Redact,
            2,
            ErrorDetail::new("discovery_error", "bad body"),
        );
        assert!(!result.is_success());
        assert_eq!(result.step(StepName::Redact).unwrap().step_number, 2);
    }

    #[test]
    fn test_step_serializes_flat() {
        let step = StepResult::success(StepName::Redact, 2, StepPayload::Text("a ###".into()));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["step_name"], "redact");
        assert_eq!(json["status"], "success");
        assert_eq!(json["payload"]["type"], "text");
        assert_eq!(json["payload"]["value"], "a ###");
        assert!(json.get("error").is_none());
    }
}
