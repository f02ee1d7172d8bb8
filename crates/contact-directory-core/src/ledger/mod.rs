//! Status ledger abstraction.
//!
//! The [`StatusLedger`] trait is the single source of truth for contact
//! progress. Backends own their own synchronization: a `set` must cover both
//! the in-memory mutation and whatever persistence the backend does, so two
//! racing writers never clobber each other's snapshot.
//!
//! This module also owns the status document codec, so every backend that
//! persists to JSON reads legacy documents and writes canonical ones the same
//! way.

pub mod memory;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::identity::RecordIdentity;
use crate::status::ContactStatus;

/// Identity → status mapping as held in memory and written to disk.
pub type LedgerEntries = BTreeMap<RecordIdentity, ContactStatus>;

/// Pluggable storage for contact status.
///
/// Implementations must be `Send + Sync`; the HTTP transport shares one
/// ledger across request handlers.
pub trait StatusLedger: Send + Sync {
    /// Status for `id`, or [`ContactStatus::NotContacted`] if never set.
    fn get(&self, id: &RecordIdentity) -> ContactStatus;

    /// Record a status and make it durable before returning.
    ///
    /// If persistence fails the in-memory change is kept and a
    /// [`PersistenceError`](crate::DirectoryError::PersistenceError) is
    /// returned.
    fn set(&self, id: &RecordIdentity, status: ContactStatus) -> Result<()>;

    /// Copy of every explicit entry.
    fn snapshot(&self) -> LedgerEntries;
}

/// A decoded status document plus the keys whose values were rejected.
#[derive(Debug, Default)]
pub struct DecodedDocument {
    pub entries: LedgerEntries,
    pub rejected: Vec<String>,
}

/// Parses a status document.
///
/// The document must be a JSON object. Values may be canonical strings or
/// legacy booleans; anything else is reported in `rejected` and skipped.
pub fn decode_document(text: &str) -> std::result::Result<DecodedDocument, serde_json::Error> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
    let mut decoded = DecodedDocument::default();
    for (key, value) in raw {
        match ContactStatus::from_document_value(&value) {
            Some(status) => {
                decoded.entries.insert(RecordIdentity::from(key), status);
            }
            None => decoded.rejected.push(key),
        }
    }
    Ok(decoded)
}

/// Renders entries as a pretty-printed JSON object with sorted keys and
/// canonical string values.
pub fn encode_document(entries: &LedgerEntries) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}
