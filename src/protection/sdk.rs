//! Protection SDK interface
//!
//! Reversible tokenization is an external service. A [`ProtectionSdk`]
//! creates sessions bound to credentials; a [`ProtectionSession`]
//! protects and unprotects single values under a data element.

use crate::error::Result;
use async_trait::async_trait;

/// Factory for authenticated protection sessions
#[async_trait]
pub trait ProtectionSdk: Send + Sync {
    /// Create a session for `policy_user`.
    ///
    /// Fails with `Error::Protection` when the bound credentials are rejected.
    async fn create_session(&self, policy_user: &str) -> Result<Box<dyn ProtectionSession>>;

    /// Human-readable name for this SDK (used in logs).
    fn name(&self) -> &str;
}

/// An authenticated protection session
#[async_trait]
pub trait ProtectionSession: Send + Sync {
    /// Tokenize `input` under `data_element`
    async fn protect(&self, data_element: &str, input: &str) -> Result<String>;

    /// Reverse a token produced by [`protect`](Self::protect)
    async fn unprotect(&self, data_element: &str, input: &str) -> Result<String>;
}
