//! License, machine and validation types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A license resource as returned by the licensing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License ID.
    pub id: String,
    /// Resource type tag.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A machine (device) registered against a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine ID.
    pub id: String,
    /// Resource type tag.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Outcome of a validate-key call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the license is valid for the requested scope.
    pub valid: bool,
    /// Human-readable explanation.
    pub detail: String,
    /// Machine-readable reason code.
    pub code: ValidationCode,
}

/// A validated license together with its validation result.
///
/// The service answers an unknown key with `data: null`, so the license is
/// optional even on a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub license: Option<License>,
    pub result: ValidationResult,
}

/// Reason code reported by the validate-key action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationCode {
    Valid,
    NotFound,
    Suspended,
    Expired,
    Overdue,
    Banned,
    NoMachine,
    NoMachines,
    TooManyMachines,
    TooManyCores,
    FingerprintScopeMismatch,
    FingerprintScopeRequired,
    ProductScopeMismatch,
    HeartbeatNotStarted,
    HeartbeatDead,
    /// A code this client does not know about, kept verbatim.
    Other(String),
}

impl ValidationCode {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationCode::Valid => "VALID",
            ValidationCode::NotFound => "NOT_FOUND",
            ValidationCode::Suspended => "SUSPENDED",
            ValidationCode::Expired => "EXPIRED",
            ValidationCode::Overdue => "OVERDUE",
            ValidationCode::Banned => "BANNED",
            ValidationCode::NoMachine => "NO_MACHINE",
            ValidationCode::NoMachines => "NO_MACHINES",
            ValidationCode::TooManyMachines => "TOO_MANY_MACHINES",
            ValidationCode::TooManyCores => "TOO_MANY_CORES",
            ValidationCode::FingerprintScopeMismatch => "FINGERPRINT_SCOPE_MISMATCH",
            ValidationCode::FingerprintScopeRequired => "FINGERPRINT_SCOPE_REQUIRED",
            ValidationCode::ProductScopeMismatch => "PRODUCT_SCOPE_MISMATCH",
            ValidationCode::HeartbeatNotStarted => "HEARTBEAT_NOT_STARTED",
            ValidationCode::HeartbeatDead => "HEARTBEAT_DEAD",
            ValidationCode::Other(code) => code,
        }
    }

    /// Whether this code means the current device is not registered for the
    /// license, so activating it would make the license valid.
    pub fn requires_activation(&self) -> bool {
        matches!(
            self,
            ValidationCode::NoMachine
                | ValidationCode::NoMachines
                | ValidationCode::FingerprintScopeMismatch
        )
    }
}

impl From<String> for ValidationCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "VALID" => ValidationCode::Valid,
            "NOT_FOUND" => ValidationCode::NotFound,
            "SUSPENDED" => ValidationCode::Suspended,
            "EXPIRED" => ValidationCode::Expired,
            "OVERDUE" => ValidationCode::Overdue,
            "BANNED" => ValidationCode::Banned,
            "NO_MACHINE" => ValidationCode::NoMachine,
            "NO_MACHINES" => ValidationCode::NoMachines,
            "TOO_MANY_MACHINES" => ValidationCode::TooManyMachines,
            "TOO_MANY_CORES" => ValidationCode::TooManyCores,
            "FINGERPRINT_SCOPE_MISMATCH" => ValidationCode::FingerprintScopeMismatch,
            "FINGERPRINT_SCOPE_REQUIRED" => ValidationCode::FingerprintScopeRequired,
            "PRODUCT_SCOPE_MISMATCH" => ValidationCode::ProductScopeMismatch,
            "HEARTBEAT_NOT_STARTED" => ValidationCode::HeartbeatNotStarted,
            "HEARTBEAT_DEAD" => ValidationCode::HeartbeatDead,
            _ => ValidationCode::Other(code),
        }
    }
}

impl From<&str> for ValidationCode {
    fn from(code: &str) -> Self {
        ValidationCode::from(code.to_string())
    }
}

impl From<ValidationCode> for String {
    fn from(code: ValidationCode) -> Self {
        match code {
            ValidationCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
