//! Semantic guardrail risk scoring
//!
//! Submits a conversation to the guardrail scan endpoint and maps the
//! response into a [`GuardrailResult`].

pub mod client;
pub mod types;

pub use client::{GuardrailClient, PromptScorer};
pub use types::{GuardrailResult, Message, Outcome};
