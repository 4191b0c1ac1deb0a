//! Pipeline orchestration
//!
//! A mode selects an ordered subset of the step graph:
//!
//! ```text
//! guardrail            (independent)
//! discover ──┬─> protect ──> unprotect
//!            └─> redact
//! ```

pub mod mode;
pub mod orchestrator;
pub mod result;

pub use mode::{ExecutionMode, StepName};
pub use orchestrator::PipelineOrchestrator;
pub use result::{PipelineResult, StepPayload, StepResult, StepStatus};
