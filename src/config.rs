//! TrialCenter configuration management
//!
//! Configuration is a single immutable value: loaded once (TOML or
//! defaults), validated once, then handed to each component by
//! construction. Nothing reads process-wide state at call time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable holding the protection service account email
pub const EMAIL_ENV: &str = "DEV_EDITION_EMAIL";
/// Environment variable holding the protection service account password
pub const PASSWORD_ENV: &str = "DEV_EDITION_PASSWORD";
/// Environment variable holding the protection service API key
pub const API_KEY_ENV: &str = "DEV_EDITION_API_KEY";

/// Main TrialCenter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrialCenterConfig {
    /// Semantic guardrail configuration
    pub guardrail: GuardrailConfig,

    /// Data discovery configuration
    pub discovery: DiscoveryConfig,

    /// Redaction and entity labelling configuration
    pub sanitization: SanitizationConfig,

    /// Protection service configuration
    pub protection: ProtectionConfig,
}

impl TrialCenterConfig {
    /// Load from a TOML file and validate
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML and validate
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint before any client is built
    pub fn validate(&self) -> Result<()> {
        check_url("guardrail.url", &self.guardrail.url)?;
        check_url("discovery.url", &self.discovery.url)?;
        check_url("protection.url", &self.protection.url)?;
        check_unit("guardrail.rejection_threshold", self.guardrail.rejection_threshold)?;
        check_unit("discovery.score_threshold", self.discovery.score_threshold)?;
        check_timeout("guardrail.timeout_secs", self.guardrail.timeout_secs)?;
        check_timeout("discovery.timeout_secs", self.discovery.timeout_secs)?;
        check_timeout("protection.timeout_secs", self.protection.timeout_secs)?;

        if self.guardrail.processors.is_empty() {
            return Err(Error::Config(
                "guardrail.processors must name at least one processor".to_string(),
            ));
        }
        if self.protection.policy_user.trim().is_empty() {
            return Err(Error::Config(
                "protection.policy_user must not be empty".to_string(),
            ));
        }
        if self.sanitization.redact_method == RedactMethod::Mask
            && self.sanitization.masking_char.chars().count() != 1
        {
            return Err(Error::Config(format!(
                "sanitization.masking_char must be exactly one character for method 'mask', got {:?}",
                self.sanitization.masking_char
            )));
        }
        for label in self.sanitization.entity_map().values() {
            check_label("sanitization.named_entity_map", label)?;
        }
        for label in self.protection.data_elements.keys() {
            check_label("protection.data_elements", label)?;
        }
        Ok(())
    }
}

/// Labels end up in `[LABEL]token[/LABEL]` tags, which only admit `[A-Z0-9_]+`
fn check_label(field: &str, label: &str) -> Result<()> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} label {:?} must use only A-Z, 0-9 and '_'",
            field, label
        )))
    }
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be an http(s) URL, got {:?}",
            field, url
        )))
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be within [0, 1], got {}",
            field, value
        )))
    }
}

fn check_timeout(field: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        Err(Error::Config(format!("{} must be greater than zero", field)))
    } else {
        Ok(())
    }
}

/// Semantic guardrail configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardrailConfig {
    /// Full scan endpoint URL
    pub url: String,

    /// Processors requested for prompt messages
    pub processors: Vec<String>,

    /// Score above which a prompt counts as rejected
    pub rejection_threshold: f64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8581/pty/semantic-guardrail/v1.1/conversations/messages/scan"
                .to_string(),
            processors: vec!["semantic".to_string()],
            rejection_threshold: 0.6,
            timeout_secs: 30,
        }
    }
}

/// Data discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Classification endpoint URL
    pub url: String,

    /// Minimum confidence for a span to be kept
    pub score_threshold: f64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8580/pty/data-discovery/v1.0/classify".to_string(),
            score_threshold: 0.6,
            timeout_secs: 30,
        }
    }
}

/// How redaction treats a detected span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactMethod {
    /// Replace every character with the masking character
    #[default]
    Mask,
    /// Remove the span entirely
    Redact,
}

/// Redaction and entity labelling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizationConfig {
    /// Redaction method
    pub redact_method: RedactMethod,

    /// Masking character (one character, used by `mask`)
    pub masking_char: String,

    /// Detector type → label overrides, merged over the built-in map
    pub named_entity_map: BTreeMap<String, String>,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            redact_method: RedactMethod::Mask,
            masking_char: "#".to_string(),
            named_entity_map: BTreeMap::new(),
        }
    }
}

impl SanitizationConfig {
    /// The masking character; `#` if unset
    pub fn mask_char(&self) -> char {
        self.masking_char.chars().next().unwrap_or('#')
    }

    /// Built-in entity map with user overrides applied
    pub fn entity_map(&self) -> BTreeMap<String, String> {
        let mut map = default_entity_map();
        map.extend(
            self.named_entity_map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        map
    }
}

/// Protection service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtectionConfig {
    /// API base URL
    pub url: String,

    /// Policy user the session is created for
    pub policy_user: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Label → data element overrides, merged over the built-in map
    pub data_elements: BTreeMap<String, String>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            url: "https://api.developer-edition.protegrity.com/v1".to_string(),
            policy_user: "superuser".to_string(),
            timeout_secs: 30,
            data_elements: BTreeMap::new(),
        }
    }
}

impl ProtectionConfig {
    /// Data element used to protect values carrying `label`
    pub fn data_element_for(&self, label: &str) -> String {
        self.data_elements
            .get(label)
            .cloned()
            .or_else(|| default_data_element(label).map(str::to_string))
            .unwrap_or_else(|| "string".to_string())
    }
}

/// Built-in detector type → label map
pub fn default_entity_map() -> BTreeMap<String, String> {
    [
        ("EMAIL_ADDRESS", "EMAIL"),
        ("EMAIL", "EMAIL"),
        ("PHONE_NUMBER", "PHONE"),
        ("MOBILE_NUMBER", "PHONE"),
        ("PERSON", "PERSON"),
        ("DATE_OF_BIRTH", "DOB"),
        ("DATE_TIME", "DATE"),
        ("ACCOUNT_NUMBER", "ACCOUNT_NUMBER"),
        ("BANK_ACCOUNT_NUMBER", "ACCOUNT_NUMBER"),
        ("CREDIT_CARD_NUMBER", "PAYMENT_CARD"),
        ("SOCIAL_SECURITY_NUMBER", "SSN"),
        ("NATIONAL_ID_NUMBER", "NATIONAL_ID"),
        ("PASSPORT", "PASSPORT"),
        ("INSURANCE_POLICY_ID", "INSURANCE_POLICY_ID"),
        ("PAN", "TAX_ID"),
        ("TAX_ID", "TAX_ID"),
        ("STATE", "STATE"),
        ("CITY", "CITY"),
        ("STREET", "STREET"),
        ("LOCATION", "LOCATION"),
        ("BUILDING", "LOCATION"),
        ("USERNAME", "USERNAME"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_data_element(label: &str) -> Option<&'static str> {
    match label {
        "PERSON" => Some("name"),
        "EMAIL" => Some("email"),
        "PHONE" => Some("phone"),
        "SSN" => Some("ssn"),
        "PAYMENT_CARD" => Some("ccn"),
        "CITY" | "STATE" | "STREET" | "LOCATION" => Some("address"),
        "DOB" | "DATE" => Some("datetime"),
        "PASSPORT" => Some("passport"),
        _ => None,
    }
}

/// Protection service credentials, read once at startup
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub api_key: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// Returns `None` unless all three variables are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Some(Self {
            email: read(EMAIL_ENV)?,
            password: read(PASSWORD_ENV)?,
            api_key: read(API_KEY_ENV)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
