//! Run artifacts: sanitized text and JSON report

use crate::error::Result;
use crate::pipeline::{ExecutionMode, PipelineResult};
use std::path::{Path, PathBuf};

/// Paths written for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub sanitized: Option<PathBuf>,
    pub report: PathBuf,
}

/// Sanitized text worth persisting: redacted output first, then protected
fn sanitized_text(result: &PipelineResult) -> Option<&str> {
    match result.mode {
        ExecutionMode::DiscoverOnly | ExecutionMode::GuardrailOnly => None,
        _ => result
            .sanitization
            .redacted_text
            .as_deref()
            .or(result.sanitization.protected_text.as_deref()),
    }
}

/// Write `{stem}_sanitized.txt` (when there is sanitized text) and
/// `{stem}_report.json` into `output_dir`, creating it if needed.
pub async fn write_report(
    result: &PipelineResult,
    output_dir: &Path,
    stem: &str,
) -> Result<ReportPaths> {
    tokio::fs::create_dir_all(output_dir).await?;

    let sanitized = match sanitized_text(result) {
        Some(text) => {
            let path = output_dir.join(format!("{}_sanitized.txt", stem));
            tokio::fs::write(&path, text).await?;
            Some(path)
        }
        None => None,
    };

    let report = output_dir.join(format!("{}_report.json", stem));
    let json = serde_json::to_string_pretty(result)?;
    tokio::fs::write(&report, json).await?;

    tracing::info!(path = %report.display(), "Report written");
    Ok(ReportPaths { sanitized, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{StepName, StepPayload, StepResult};
    use tempfile::TempDir;

    fn redacted_result() -> PipelineResult {
        let mut result = PipelineResult::new(ExecutionMode::RedactOnly);
        result.sanitization.redacted_text = Some("My SSN is ###########.".to_string());
        result.steps.push(StepResult::success(
            StepName::Redact,
            2,
            StepPayload::Text("My SSN is ###########.".to_string()),
        ));
        result
    }

    #[tokio::test]
    async fn test_write_report_creates_both_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        let result = redacted_result();

        let paths = write_report(&result, &out, "prompt").await.unwrap();

        let sanitized = paths.sanitized.unwrap();
        assert!(sanitized.ends_with("prompt_sanitized.txt"));
        assert_eq!(
            std::fs::read_to_string(sanitized).unwrap(),
            "My SSN is ###########."
        );

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.report).unwrap()).unwrap();
        assert_eq!(json["mode"], "REDACT_ONLY");
        assert_eq!(json["steps"][0]["step_number"], 2);
        assert_eq!(json["run_id"], result.run_id);
    }

    #[tokio::test]
    async fn test_discover_only_writes_report_only() {
        let dir = TempDir::new().unwrap();
        let mut result = PipelineResult::new(ExecutionMode::DiscoverOnly);
        result.sanitization.redacted_text = Some("unexpected".to_string());

        let paths = write_report(&result, dir.path(), "prompt").await.unwrap();
        assert!(paths.sanitized.is_none());
        assert!(!dir.path().join("prompt_sanitized.txt").exists());
        assert!(paths.report.exists());
    }

    #[tokio::test]
    async fn test_protected_text_used_without_redaction() {
        let dir = TempDir::new().unwrap();
        let mut result = PipelineResult::new(ExecutionMode::ProtectUnprotect);
        result.sanitization.protected_text = Some("[SSN]tok[/SSN]".to_string());

        let paths = write_report(&result, dir.path(), "p").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(paths.sanitized.unwrap()).unwrap(),
            "[SSN]tok[/SSN]"
        );
    }

    #[tokio::test]
    async fn test_failed_run_writes_no_sanitized_text() {
        let dir = TempDir::new().unwrap();
        let result = PipelineResult::new(ExecutionMode::Full);

        let paths = write_report(&result, dir.path(), "p").await.unwrap();
        assert!(paths.sanitized.is_none());
    }
}
