//! The two-valued contact status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Whether a person has been reached yet. Defaults to `not_contacted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Contacted,
    #[default]
    NotContacted,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Contacted => "contacted",
            ContactStatus::NotContacted => "not_contacted",
        }
    }

    pub fn is_contacted(&self) -> bool {
        matches!(self, ContactStatus::Contacted)
    }

    /// Reads a value from a status document, accepting the boolean form
    /// older documents used. Returns `None` for anything else.
    pub fn from_document_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Bool(true) => Some(ContactStatus::Contacted),
            serde_json::Value::Bool(false) => Some(ContactStatus::NotContacted),
            _ => None,
        }
    }
}

impl FromStr for ContactStatus {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contacted" => Ok(ContactStatus::Contacted),
            "not_contacted" => Ok(ContactStatus::NotContacted),
            other => Err(DirectoryError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
