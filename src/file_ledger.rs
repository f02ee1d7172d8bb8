//! JSON-file-backed [`StatusLedger`].
//!
//! The whole ledger lives in memory behind one mutex and is written out in
//! full after every `set`, while the lock is still held. Writes go to a
//! sibling `.tmp` file that is then renamed over the document, so a crash
//! mid-write leaves the previous document intact.
//!
//! Loading is fail-open: a missing document is an empty ledger, and an
//! unreadable or malformed one is logged and treated as empty.

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

use contact_directory_core::ledger::{decode_document, encode_document, LedgerEntries};
use contact_directory_core::{ContactStatus, DirectoryError, RecordIdentity, Result, StatusLedger};

/// Status ledger persisted as a JSON object at a fixed path.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    entries: Mutex<LedgerEntries>,
}

impl FileLedger {
    /// Opens the ledger at `path`. Never fails; see the module docs.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &LedgerEntries) -> Result<()> {
        let to_error = |reason: String| DirectoryError::PersistenceError {
            path: self.path.clone(),
            reason,
        };
        let json = encode_document(entries).map_err(|e| to_error(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| to_error(e.to_string()))
    }
}

impl StatusLedger for FileLedger {
    fn get(&self, id: &RecordIdentity) -> ContactStatus {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).copied().unwrap_or_default()
    }

    fn set(&self, id: &RecordIdentity, status: ContactStatus) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id.clone(), status);
        if let Err(e) = self.persist(&entries) {
            error!(record_id = %id, error = %e, "status change kept in memory but not saved");
            return Err(e);
        }
        Ok(())
    }

    fn snapshot(&self) -> LedgerEntries {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reads the status document at `path`, falling back to an empty ledger.
pub fn load_entries(path: &Path) -> LedgerEntries {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LedgerEntries::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read status document; starting empty");
            return LedgerEntries::new();
        }
    };

    match decode_document(&content) {
        Ok(doc) => {
            if !doc.rejected.is_empty() {
                warn!(
                    path = %path.display(),
                    dropped = doc.rejected.len(),
                    "ignored status entries with unrecognized values"
                );
            }
            info!(path = %path.display(), entries = doc.entries.len(), "loaded contact status");
            doc.entries
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed status document; starting empty");
            LedgerEntries::new()
        }
    }
}

/// Writes `contents` to `path` via a temporary sibling and a rename.
///
/// Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
