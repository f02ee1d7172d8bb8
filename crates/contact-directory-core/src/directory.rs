//! Query/command facade.
//!
//! [`Directory`] is the only entry point transport layers (CLI, HTTP) use.
//! It owns the immutable [`RecordSet`] and a [`StatusLedger`], and delegates:
//! search goes to [`crate::search`], status reads and writes go to the
//! ledger. A directory built with [`Directory::unavailable`] answers every
//! data query with [`DirectoryError::DataUnavailable`] but still serves
//! status calls.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`list_all`](Directory::list_all) | Every record, in source order |
//! | [`search`](Directory::search) | Case-insensitive substring filter |
//! | [`columns`](Directory::columns) | Column names of the loaded records |
//! | [`get_status`](Directory::get_status) | Status for an identity |
//! | [`set_status`](Directory::set_status) | Validate and record a status |
//! | [`suggest`](Directory::suggest) | Autocomplete values |
//! | [`stats`](Directory::stats) | Contacted / not-contacted totals |

use std::sync::Arc;

use crate::error::{DirectoryError, Result};
use crate::identity::RecordIdentity;
use crate::ledger::StatusLedger;
use crate::models::{DirectoryStats, Record, RecordSet};
use crate::search::{self, Suggestion};
use crate::status::ContactStatus;

pub struct Directory<L> {
    records: Option<Arc<RecordSet>>,
    ledger: L,
}

impl<L: StatusLedger> Directory<L> {
    pub fn new(records: RecordSet, ledger: L) -> Self {
        Self {
            records: Some(Arc::new(records)),
            ledger,
        }
    }

    /// A directory whose records failed to load.
    pub fn unavailable(ledger: L) -> Self {
        Self {
            records: None,
            ledger,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    pub fn record_set(&self) -> Result<&Arc<RecordSet>> {
        self.records.as_ref().ok_or(DirectoryError::DataUnavailable)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn list_all(&self) -> Result<&[Record]> {
        Ok(self.record_set()?.records())
    }

    pub fn search(&self, query: &str) -> Result<Vec<&Record>> {
        Ok(search::search(self.record_set()?.records(), query))
    }

    /// Column names. Fails when there are no records, as there is nothing
    /// to describe.
    pub fn columns(&self) -> Result<&[String]> {
        let set = self.record_set()?;
        if set.is_empty() {
            return Err(DirectoryError::DataUnavailable);
        }
        Ok(set.columns())
    }

    pub fn identity(&self, record: &Record) -> RecordIdentity {
        RecordIdentity::of(record)
    }

    pub fn get_status(&self, id: &str) -> ContactStatus {
        self.ledger.get(&RecordIdentity::from(id))
    }

    /// Parses `status` and records it for `id`.
    ///
    /// Invalid input is rejected before the ledger is touched.
    pub fn set_status(&self, id: &str, status: &str) -> Result<ContactStatus> {
        if id.is_empty() {
            return Err(DirectoryError::InvalidRecordId);
        }
        let status: ContactStatus = status.parse()?;
        self.ledger.set(&RecordIdentity::from(id), status)?;
        Ok(status)
    }

    pub fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>> {
        Ok(search::suggest(self.record_set()?.records(), query, limit))
    }

    /// Totals over loaded records. Records sharing an identity share a status
    /// and are counted individually.
    pub fn stats(&self) -> Result<DirectoryStats> {
        let records = self.record_set()?.records();
        let snapshot = self.ledger.snapshot();
        let contacted = records
            .iter()
            .filter(|r| {
                snapshot
                    .get(&RecordIdentity::of(r))
                    .is_some_and(ContactStatus::is_contacted)
            })
            .count();
        Ok(DirectoryStats {
            total: records.len(),
            contacted,
            not_contacted: records.len() - contacted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::InMemoryLedger;
    use crate::models::SCHEMA_FIELDS;

    fn asha() -> Record {
        Record::from_pairs([
            ("Name", "Asha"),
            ("Contact", "123"),
            ("Email", "a@x.com"),
            ("Department", "CS"),
        ])
    }

    fn bina() -> Record {
        Record::from_pairs([
            ("Name", "Bina"),
            ("Contact", "456"),
            ("Email", "b@x.com"),
            ("Department", "EE"),
        ])
    }

    fn directory() -> Directory<InMemoryLedger> {
        let columns = vec![
            "Name".to_string(),
            "Contact".to_string(),
            "Email".to_string(),
            "Department".to_string(),
        ];
        Directory::new(
            RecordSet::new(columns, vec![asha(), bina()]),
            InMemoryLedger::new(),
        )
    }

    #[test]
    fn end_to_end_scenario() {
        let dir = directory();

        let hits = dir.search("cs").unwrap();
        assert_eq!(hits, vec![&asha()]);

        let asha_id = dir.identity(&asha());
        let bina_id = dir.identity(&bina());
        assert_eq!(
            dir.set_status(asha_id.as_str(), "contacted").unwrap(),
            ContactStatus::Contacted
        );
        assert_eq!(dir.get_status(asha_id.as_str()).as_str(), "contacted");
        assert_eq!(dir.get_status(bina_id.as_str()).as_str(), "not_contacted");
    }

    #[test]
    fn invalid_status_leaves_ledger_unchanged() {
        let dir = directory();
        let id = dir.identity(&asha());
        dir.set_status(id.as_str(), "contacted").unwrap();

        let err = dir.set_status(id.as_str(), "maybe").unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidStatus(ref v) if v == "maybe"));
        assert_eq!(dir.get_status(id.as_str()), ContactStatus::Contacted);
        assert_eq!(dir.ledger().snapshot().len(), 1);
    }

    #[test]
    fn empty_id_rejected() {
        let dir = directory();
        let err = dir.set_status("", "contacted").unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidRecordId));
        assert!(dir.ledger().snapshot().is_empty());
    }

    #[test]
    fn whitespace_id_is_a_key_like_any_other() {
        let dir = directory();
        dir.set_status(" ", "contacted").unwrap();
        assert_eq!(dir.get_status(" "), ContactStatus::Contacted);
        assert_eq!(dir.get_status(""), ContactStatus::NotContacted);
    }

    #[test]
    fn default_status_for_unknown_id() {
        let dir = directory();
        assert_eq!(dir.get_status("never-set"), ContactStatus::NotContacted);
    }

    #[test]
    fn list_and_columns() {
        let dir = directory();
        assert_eq!(dir.list_all().unwrap().len(), 2);
        assert_eq!(dir.columns().unwrap()[0], "Name");
        assert_eq!(dir.search("").unwrap().len(), 2);
    }

    #[test]
    fn unavailable_directory_still_tracks_status() {
        let dir = Directory::unavailable(InMemoryLedger::new());
        assert!(!dir.is_loaded());
        assert!(matches!(dir.list_all(), Err(DirectoryError::DataUnavailable)));
        assert!(matches!(dir.search("x"), Err(DirectoryError::DataUnavailable)));
        assert!(matches!(dir.columns(), Err(DirectoryError::DataUnavailable)));
        assert!(matches!(dir.stats(), Err(DirectoryError::DataUnavailable)));

        dir.set_status("abc", "contacted").unwrap();
        assert_eq!(dir.get_status("abc"), ContactStatus::Contacted);
    }

    #[test]
    fn columns_of_empty_set_are_unavailable() {
        let columns = SCHEMA_FIELDS.iter().map(|s| s.to_string()).collect();
        let dir = Directory::new(RecordSet::new(columns, Vec::new()), InMemoryLedger::new());
        assert!(matches!(dir.columns(), Err(DirectoryError::DataUnavailable)));
        assert!(dir.list_all().unwrap().is_empty());
    }

    #[test]
    fn stats_count_contacted_records() {
        let dir = directory();
        let id = dir.identity(&asha());
        dir.set_status(id.as_str(), "contacted").unwrap();
        dir.set_status("stale-id-not-in-records", "contacted").unwrap();

        let stats = dir.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.contacted, 1);
        assert_eq!(stats.not_contacted, 1);
    }

    #[test]
    fn suggest_delegates() {
        let dir = directory();
        let s = dir.suggest("bi", 10).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].text, "Bina");
    }
}
