//! Execution modes and their step lists

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Guardrail,
    Discover,
    Protect,
    Unprotect,
    Redact,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Guardrail => "guardrail",
            StepName::Discover => "discover",
            StepName::Protect => "protect",
            StepName::Unprotect => "unprotect",
            StepName::Redact => "redact",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subset of the step graph a run executes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    #[default]
    Full,
    GuardrailOnly,
    DiscoverOnly,
    ProtectUnprotect,
    RedactOnly,
}

impl ExecutionMode {
    /// Ordered steps for this mode. Step numbers are positions in this list.
    pub fn steps(&self) -> &'static [StepName] {
        use StepName::*;
        match self {
            ExecutionMode::Full => &[Guardrail, Discover, Protect, Unprotect, Redact],
            ExecutionMode::GuardrailOnly => &[Guardrail],
            ExecutionMode::DiscoverOnly => &[Discover],
            ExecutionMode::ProtectUnprotect => &[Discover, Protect, Unprotect],
            ExecutionMode::RedactOnly => &[Discover, Redact],
        }
    }

    /// 1-based step number within this mode
    pub fn step_number(&self, step: StepName) -> Option<usize> {
        self.steps().iter().position(|s| *s == step).map(|i| i + 1)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExecutionMode::Full => "Full Pipeline",
            ExecutionMode::GuardrailOnly => "Semantic Guardrail",
            ExecutionMode::DiscoverOnly => "Discover Sensitive Data",
            ExecutionMode::ProtectUnprotect => "Find, Protect & Unprotect",
            ExecutionMode::RedactOnly => "Find & Redact",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_only_numbering() {
        let mode = ExecutionMode::RedactOnly;
        assert_eq!(mode.step_number(StepName::Discover), Some(1));
        assert_eq!(mode.step_number(StepName::Redact), Some(2));
        assert_eq!(mode.step_number(StepName::Guardrail), None);
    }

    #[test]
    fn test_full_numbering() {
        let mode = ExecutionMode::Full;
        assert_eq!(mode.step_number(StepName::Guardrail), Some(1));
        assert_eq!(mode.step_number(StepName::Redact), Some(5));
    }

    #[test]
    fn test_every_mode_numbers_from_one() {
        for mode in [
            ExecutionMode::Full,
            ExecutionMode::GuardrailOnly,
            ExecutionMode::DiscoverOnly,
            ExecutionMode::ProtectUnprotect,
            ExecutionMode::RedactOnly,
        ] {
            let numbers: Vec<usize> = mode
                .steps()
                .iter()
                .filter_map(|s| mode.step_number(*s))
                .collect();
            let expected: Vec<usize> = (1..=mode.steps().len()).collect();
            assert_eq!(numbers, expected, "{}", mode);
        }
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&ExecutionMode::ProtectUnprotect).unwrap();
        assert_eq!(json, "\"PROTECT_UNPROTECT\"");
        let mode: ExecutionMode = serde_json::from_str("\"REDACT_ONLY\"").unwrap();
        assert_eq!(mode, ExecutionMode::RedactOnly);
    }

    #[test]
    fn test_cli_value_names() {
        use clap::ValueEnum;
        let mode = ExecutionMode::from_str("guardrail-only", false).unwrap();
        assert_eq!(mode, ExecutionMode::GuardrailOnly);
        assert_eq!(mode.to_string(), "Semantic Guardrail");
    }
}
