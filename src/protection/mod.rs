//! Reversible protection (tokenization) service binding

pub mod http;
pub mod sdk;

pub use http::HttpProtectionSdk;
pub use sdk::{ProtectionSdk, ProtectionSession};
