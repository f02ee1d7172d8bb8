//! In-memory [`StatusLedger`] for tests and embedders that persist elsewhere.

use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::identity::RecordIdentity;
use crate::status::ContactStatus;

use super::{LedgerEntries, StatusLedger};

/// Ledger held in a `BTreeMap` behind a mutex. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<LedgerEntries>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: LedgerEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl StatusLedger for InMemoryLedger {
    fn get(&self, id: &RecordIdentity) -> ContactStatus {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).copied().unwrap_or_default()
    }

    fn set(&self, id: &RecordIdentity, status: ContactStatus) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id.clone(), status);
        Ok(())
    }

    fn snapshot(&self) -> LedgerEntries {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
