//! Sensitive-entity discovery
//!
//! Calls a classification service per line and returns normalized,
//! validated entity spans:
//! - Pluggable classifier backend (Data Discovery REST by default)
//! - Span validation and confidence-threshold filtering
//! - Detector type → label resolution

pub mod backend;
pub mod client;
pub mod entity;

pub use backend::{ClassifierBackend, HttpClassifier, RawClassification};
pub use client::DiscoveryClient;
pub use entity::{EntityMap, EntitySpan};
