//! Stable record identity.
//!
//! A [`RecordIdentity`] is the SHA-256 (lowercase hex) of a record's `Name`,
//! `Contact`, and `Email` values, sorted and joined by the ASCII unit
//! separator. Sorting makes the key independent of which of the three fields
//! a value sits in and of the record's field order; the other fields never
//! contribute. Distinct people sharing all three values collide.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{Record, FIELD_CONTACT, FIELD_EMAIL, FIELD_NAME};

const SEPARATOR: u8 = 0x1f;

/// Ledger key for a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordIdentity(String);

impl RecordIdentity {
    /// Identity of a record. Missing key fields count as empty strings.
    pub fn of(record: &Record) -> Self {
        Self::from_parts(
            record.get(FIELD_NAME).unwrap_or_default(),
            record.get(FIELD_CONTACT).unwrap_or_default(),
            record.get(FIELD_EMAIL).unwrap_or_default(),
        )
    }

    pub fn from_parts(name: &str, contact: &str, email: &str) -> Self {
        let mut parts = [name, contact, email];
        parts.sort_unstable();

        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([SEPARATOR]);
            }
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RecordIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
