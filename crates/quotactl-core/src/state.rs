//! Provisioning state reported by the Quota control plane
//!
//! The remote service classifies a long-running request with a small set of
//! state strings. Every place that reads one goes through
//! [`ProvisioningState::parse`] so the terminal/non-terminal split lives in
//! one closed enumeration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Remote classification of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    /// Request accepted, work not started yet
    Accepted,
    /// Work in progress
    InProgress,
    /// Completed successfully
    Succeeded,
    /// Completed with an error; the request must be resubmitted to retry
    Failed,
    /// Needs manual (out-of-band) approval, e.g. by a capacity manager
    Escalated,
    /// A value this client does not recognise.
    ///
    /// Treated as non-terminal so new remote states never abort a poll loop.
    Unknown(String),
}

impl ProvisioningState {
    /// Parse a remote state string
    ///
    /// Only the five known names match (ignoring ASCII case); anything else
    /// is kept verbatim as [`ProvisioningState::Unknown`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "inprogress" => Self::InProgress,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "escalated" => Self::Escalated,
            _ => Self::Unknown(value.to_string()),
        }
    }

    /// True for `Succeeded`, `Failed` and `Escalated`
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Escalated)
    }

    /// Wire representation used by the remote API
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "Accepted",
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Escalated => "Escalated",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for ProvisioningState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProvisioningState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
