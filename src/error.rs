//! TrialCenter error types
//!
//! [`Error`] is what component operations return. Once an error is attached
//! to a pipeline step it is flattened into an [`ErrorDetail`], which is
//! serializable and safe to show to a user.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remediation hint shown when protection cannot authenticate
pub const CREDENTIALS_HINT: &str =
    "Set DEV_EDITION_EMAIL, DEV_EDITION_PASSWORD and DEV_EDITION_API_KEY and rerun.";

/// How an outbound service call went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Endpoint answered with a non-2xx status
    Status,
    /// The call did not complete within the configured timeout
    Timeout,
    /// Connection could not be established
    Unreachable,
    /// 2xx response whose body could not be interpreted
    MalformedBody,
}

/// Failure of a guardrail or discovery endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    pub endpoint: String,
    pub http_status: Option<u16>,
    pub body: String,
    pub kind: ServiceErrorKind,
}

impl ServiceError {
    /// Build from a transport-level reqwest failure
    pub fn from_transport(endpoint: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ServiceErrorKind::Timeout
        } else {
            ServiceErrorKind::Unreachable
        };
        Self {
            endpoint: endpoint.to_string(),
            http_status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
            kind,
        }
    }

    /// Non-success HTTP status
    pub fn status(endpoint: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            http_status: Some(status),
            body: body.into(),
            kind: ServiceErrorKind::Status,
        }
    }

    /// Success status but the body was unusable
    pub fn malformed(endpoint: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            http_status: Some(status),
            body: body.into(),
            kind: ServiceErrorKind::MalformedBody,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.http_status) {
            (ServiceErrorKind::Timeout, _) => write!(f, "{} timed out", self.endpoint),
            (ServiceErrorKind::Unreachable, _) => {
                write!(f, "{} unreachable: {}", self.endpoint, self.body)
            }
            (ServiceErrorKind::MalformedBody, status) => write!(
                f,
                "{} returned a malformed body (status {}): {}",
                self.endpoint,
                status.unwrap_or_default(),
                self.body
            ),
            (ServiceErrorKind::Status, status) => write!(
                f,
                "{} failed ({}): {}",
                self.endpoint,
                status.unwrap_or_default(),
                self.body
            ),
        }
    }
}

impl std::error::Error for ServiceError {}

/// TrialCenter error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Guardrail or discovery endpoint failure
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Malformed discovery response
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Protection SDK call raised
    #[error("Protection error: {reason}")]
    Protection { reason: String },

    /// Protection returned unchanged text although entities were present
    #[error("Protection returned unchanged text for {entities} detected entities")]
    SilentFailure { entities: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn protection(reason: impl Into<String>) -> Self {
        Error::Protection {
            reason: reason.into(),
        }
    }

    /// Taxonomy name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::Toml(_) => "config_error",
            Error::Service(e) if e.kind == ServiceErrorKind::Timeout => "timeout",
            Error::Service(_) => "service_error",
            Error::Discovery(_) => "discovery_error",
            Error::Protection { .. } => "protection_error",
            Error::SilentFailure { .. } => "silent_failure",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Remediation text for the user, if there is a useful one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Protection { .. } | Error::SilentFailure { .. } => Some(CREDENTIALS_HINT),
            Error::Service(e) => match e.kind {
                ServiceErrorKind::Timeout | ServiceErrorKind::Unreachable => {
                    Some("Check that the service container is running and the URL is correct.")
                }
                _ => None,
            },
            Error::Config(_) | Error::Toml(_) => Some("Fix the configuration file and rerun."),
            _ => None,
        }
    }
}

/// Serializable error attached to a step or sanitization result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorDetail {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&Error> for ErrorDetail {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            hint: err.hint().map(str::to_string),
        }
    }
}

impl From<Error> for ErrorDetail {
    fn from(err: Error) -> Self {
        ErrorDetail::from(&err)
    }
}

/// Result type alias for TrialCenter operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let timeout = Error::Service(ServiceError {
            endpoint: "http://x".into(),
            http_status: None,
            body: String::new(),
            kind: ServiceErrorKind::Timeout,
        });
        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(
            Error::Service(ServiceError::status("http://x", 500, "boom")).kind(),
            "service_error"
        );
        assert_eq!(Error::Discovery("bad".into()).kind(), "discovery_error");
        assert_eq!(Error::protection("denied").kind(), "protection_error");
        assert_eq!(Error::SilentFailure { entities: 2 }.kind(), "silent_failure");
        assert_eq!(Error::Config("x".into()).kind(), "config_error");
    }

    #[test]
    fn test_protection_errors_carry_credentials_hint() {
        let detail = ErrorDetail::from(Error::protection("session expired"));
        assert_eq!(detail.kind, "protection_error");
        assert_eq!(detail.hint.as_deref(), Some(CREDENTIALS_HINT));
        assert!(detail.message.contains("session expired"));
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::status("http://guard/scan", 503, "unavailable");
        assert_eq!(
            err.to_string(),
            "http://guard/scan failed (503): unavailable"
        );
    }

    #[test]
    fn test_error_detail_serialize_skips_missing_hint() {
        let detail = ErrorDetail::new("discovery_error", "bad offsets");
        let json = serde_json::to_string(&detail).unwrap();
        assert!(!json.contains("hint"));
    }
}
