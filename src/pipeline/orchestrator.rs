//! Mode-driven step execution

use super::mode::{ExecutionMode, StepName};
use super::result::{PipelineResult, StepPayload, StepResult, StepStatus};
use crate::config::{Credentials, TrialCenterConfig};
use crate::discovery::{DiscoveryClient, EntityMap, HttpClassifier};
use crate::error::{Error, ErrorDetail, CREDENTIALS_HINT};
use crate::guardrail::{GuardrailClient, PromptScorer};
use crate::protection::{HttpProtectionSdk, ProtectionSdk};
use crate::sanitizer::{DiscoveredText, ProtectedText, Sanitizer, Transform};
use std::sync::Arc;
use tracing::Level;

/// Remediation for a protect/unprotect round trip that lost data
pub const REVERSIBILITY_HINT: &str =
    "Check that protection.data_elements maps each label to a reversible data element.";

/// Runs the steps selected by an [`ExecutionMode`].
///
/// Steps run one after another. Discovery happens once per run and every
/// transform reuses its spans. A failed step forces its dependents to
/// `skipped`; independent steps still run.
pub struct PipelineOrchestrator {
    guardrail: Arc<dyn PromptScorer>,
    sanitizer: Arc<Sanitizer>,
    can_protect: bool,
}

impl PipelineOrchestrator {
    pub fn new(guardrail: Arc<dyn PromptScorer>, sanitizer: Arc<Sanitizer>) -> Self {
        let can_protect = sanitizer.can_protect();
        if !can_protect {
            tracing::warn!("Protection credentials not configured; protect and unprotect are disabled");
        }
        Self {
            guardrail,
            sanitizer,
            can_protect,
        }
    }

    /// Build HTTP-backed clients from a validated config.
    ///
    /// `credentials` is read once by the caller; `None` disables protection.
    pub fn from_config(
        config: &TrialCenterConfig,
        credentials: Option<Credentials>,
    ) -> crate::Result<Self> {
        config.validate()?;

        let guardrail = Arc::new(GuardrailClient::new(&config.guardrail)?);
        let discovery = Arc::new(DiscoveryClient::new(
            Box::new(HttpClassifier::new(&config.discovery)?),
            config.discovery.score_threshold,
            EntityMap::new(config.sanitization.entity_map()),
        ));
        let protector = match credentials {
            Some(credentials) => Some(Arc::new(HttpProtectionSdk::new(
                &config.protection,
                credentials,
            )?) as Arc<dyn ProtectionSdk>),
            None => None,
        };
        let sanitizer = Sanitizer::new(
            discovery,
            protector,
            config.sanitization.clone(),
            config.protection.clone(),
        )?;

        Ok(Self::new(guardrail, Arc::new(sanitizer)))
    }

    /// Run `mode` over `input`
    pub async fn run(&self, mode: ExecutionMode, input: &str) -> PipelineResult {
        let mut result = PipelineResult::new(mode);
        tracing::info!(run_id = %result.run_id, mode = %mode, "Pipeline run started");

        if let Some(number) = mode.step_number(StepName::Guardrail) {
            let step = match self.guardrail.score_prompt(input).await {
                Ok(score) => StepResult::success(
                    StepName::Guardrail,
                    number,
                    StepPayload::Guardrail(score),
                ),
                Err(e) => StepResult::failed(StepName::Guardrail, number, ErrorDetail::from(e)),
            };
            record(&mut result, step);
        }

        let mut discovered: Option<DiscoveredText> = None;
        if let Some(number) = mode.step_number(StepName::Discover) {
            let step = match self.sanitizer.discover_text(input).await {
                Ok(d) => {
                    let entities = d.entities();
                    result.sanitization.entities = entities.clone();
                    discovered = Some(d);
                    StepResult::success(StepName::Discover, number, StepPayload::Entities(entities))
                }
                Err(e) => {
                    let detail = ErrorDetail::from(e);
                    note_error(&mut result, &detail);
                    StepResult::failed(StepName::Discover, number, detail)
                }
            };
            record(&mut result, step);
        }

        let mut protected: Option<ProtectedText> = None;
        if let Some(number) = mode.step_number(StepName::Protect) {
            let step = match &discovered {
                None => StepResult::skipped(StepName::Protect, number, None),
                Some(_) if !self.can_protect => {
                    let detail = missing_credentials();
                    if mode == ExecutionMode::ProtectUnprotect {
                        note_error(&mut result, &detail);
                        StepResult::failed(StepName::Protect, number, detail)
                    } else {
                        StepResult::skipped(StepName::Protect, number, Some(detail))
                    }
                }
                Some(d) => match self.sanitizer.protect(d).await {
                    Ok(p) => {
                        let text = p.text();
                        result.sanitization.protected_text = Some(text.clone());
                        protected = Some(p);
                        StepResult::success(StepName::Protect, number, StepPayload::Text(text))
                    }
                    Err(e) => {
                        let detail = ErrorDetail::from(e);
                        note_error(&mut result, &detail);
                        StepResult::failed(StepName::Protect, number, detail)
                    }
                },
            };
            record(&mut result, step);
        }

        if let Some(number) = mode.step_number(StepName::Unprotect) {
            let step = match &protected {
                None => StepResult::skipped(StepName::Unprotect, number, None),
                Some(p) => match self.verify_reversible(p, input).await {
                    Ok(restored) => {
                        result.sanitization.unprotected_text = Some(restored.clone());
                        StepResult::success(StepName::Unprotect, number, StepPayload::Text(restored))
                    }
                    Err(detail) => {
                        note_error(&mut result, &detail);
                        StepResult::failed(StepName::Unprotect, number, detail)
                    }
                },
            };
            record(&mut result, step);
        }

        if let Some(number) = mode.step_number(StepName::Redact) {
            let step = match &discovered {
                None => StepResult::skipped(StepName::Redact, number, None),
                Some(d) => match self.sanitizer.apply(d, Transform::Redact).await {
                    Ok(text) => {
                        result.sanitization.redacted_text = Some(text.clone());
                        StepResult::success(StepName::Redact, number, StepPayload::Text(text))
                    }
                    Err(e) => {
                        let detail = ErrorDetail::from(e);
                        note_error(&mut result, &detail);
                        StepResult::failed(StepName::Redact, number, detail)
                    }
                },
            };
            record(&mut result, step);
        }

        tracing::info!(
            run_id = %result.run_id,
            success = result.is_success(),
            "Pipeline run finished"
        );
        result
    }

    async fn verify_reversible(
        &self,
        protected: &ProtectedText,
        original: &str,
    ) -> std::result::Result<String, ErrorDetail> {
        let restored = self
            .sanitizer
            .unprotect(protected)
            .await
            .map_err(ErrorDetail::from)?;
        if normalize_whitespace(&restored) != normalize_whitespace(original) {
            tracing::warn!(
                tokens = protected.token_count(),
                "Unprotect output did not match the original text"
            );
            let mismatch = Error::protection("unprotect output did not match the original text");
            return Err(ErrorDetail::from(mismatch).with_hint(REVERSIBILITY_HINT));
        }
        Ok(restored)
    }
}

/// Failed steps log at error, skips with a reason at warn
fn step_level(step: &StepResult) -> Level {
    match (step.status, &step.error) {
        (StepStatus::Failed, _) => Level::ERROR,
        (StepStatus::Skipped, Some(_)) => Level::WARN,
        _ => Level::INFO,
    }
}

fn record(result: &mut PipelineResult, step: StepResult) {
    let kind = step.error.as_ref().map(|e| e.kind.as_str()).unwrap_or("");
    let level = step_level(&step);
    if level == Level::ERROR {
        tracing::error!(
            step = %step.step_name,
            number = step.step_number,
            kind,
            "Step failed"
        );
    } else if level == Level::WARN {
        tracing::warn!(
            step = %step.step_name,
            number = step.step_number,
            kind,
            "Step skipped"
        );
    } else {
        tracing::info!(
            step = %step.step_name,
            number = step.step_number,
            status = %step.status,
            "Step finished"
        );
    }
    result.steps.push(step);
}

/// Keep the first sanitization error
fn note_error(result: &mut PipelineResult, detail: &ErrorDetail) {
    if result.sanitization.sanitize_error.is_none() {
        result.sanitization.sanitize_error = Some(detail.clone());
    }
}

fn missing_credentials() -> ErrorDetail {
    ErrorDetail::new(
        "protection_error",
        "Protection credentials are not configured",
    )
    .with_hint(CREDENTIALS_HINT)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
