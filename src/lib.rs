//! TrialCenter - GenAI privacy pipeline
//!
//! TrialCenter runs a prompt through semantic risk scoring and sensitive
//! data handling before it reaches a model.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   PipelineOrchestrator                      │
//! │      mode ──> ordered steps, numbered 1..N within mode      │
//! │                                                             │
//! │  ┌─────────────┐  ┌──────────────────────────────────────┐  │
//! │  │  Guardrail  │  │              Sanitizer               │  │
//! │  │  risk score │  │  discover ──┬─> protect ─> unprotect │  │
//! │  │             │  │             └─> redact               │  │
//! │  └──────┬──────┘  └─────────┬──────────────────┬─────────┘  │
//! └─────────┼───────────────────┼──────────────────┼────────────┘
//!           │ HTTP              │ HTTP             │ HTTP session
//!   ┌───────▼───────┐   ┌───────▼────────┐  ┌──────▼──────────┐
//!   │   Semantic    │   │ Data Discovery │  │   Protection    │
//!   │   Guardrail   │   │   classifier   │  │   (tokenizer)   │
//!   └───────────────┘   └────────────────┘  └─────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A failed protect is reported as a failure, never replaced by redaction
//! - Discovery runs once per run; protect and redact share its spans
//! - Blank lines are never sent to discovery
//! - Missing credentials disable only protect and unprotect
//!
//! ## Modules
//!
//! - [`guardrail`]: Semantic guardrail client
//! - [`discovery`]: Entity discovery and span validation
//! - [`protection`]: Protection SDK interface and REST binding
//! - [`sanitizer`]: Protect, unprotect and redact transforms
//! - [`pipeline`]: Execution modes, orchestration and results
//! - [`report`]: Run artifacts
//! - [`config`]: Configuration and credentials

pub mod config;
pub mod discovery;
pub mod error;
pub mod guardrail;
pub mod pipeline;
pub mod protection;
pub mod report;
pub mod sanitizer;

pub use config::{Credentials, TrialCenterConfig};
pub use error::{Error, ErrorDetail, Result};
pub use pipeline::{ExecutionMode, PipelineOrchestrator, PipelineResult};
