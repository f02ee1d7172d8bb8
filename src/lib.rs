//! # Contact Directory
//!
//! A local-first contact directory. Records come from a single spreadsheet,
//! are searched in memory, and each contact's "contacted / not contacted"
//! state is kept in a small JSON document next to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ Spreadsheet │──▶│ Record Store │──▶│ Directory (core)     │
//! │   (.xlsx)   │   │ normalize    │   │ search + status      │
//! └─────────────┘   └──────────────┘   └─────┬────────────┬───┘
//!                                           │            │
//!                    ┌──────────────┐  ┌────▼────┐  ┌────▼────┐
//!                    │ FileLedger   │◀─│   CLI   │  │  HTTP   │
//!                    │ status.json  │  │ (cdir)  │  │ (axum)  │
//!                    └──────────────┘  └─────────┘  └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cdir search "computer science"
//! cdir status set <record-id> contacted
//! cdir serve                    # start HTTP server on 0.0.0.0:5001
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`spreadsheet`] | Minimal `.xlsx` worksheet decoder |
//! | [`record_store`] | Spreadsheet → normalized records, with optional cache |
//! | [`file_ledger`] | JSON-file-backed status ledger |
//! | [`server`] | HTTP transport |
//!
//! Domain types and the [`Directory`] facade live in `contact-directory-core`
//! and are re-exported here.

pub mod config;
pub mod file_ledger;
pub mod record_store;
pub mod server;
pub mod spreadsheet;

pub use contact_directory_core::{
    export, search, ContactStatus, Directory, DirectoryError, InMemoryLedger, Record,
    RecordIdentity, RecordSet, StatusLedger,
};

use tracing::error;

use crate::config::Config;
use crate::file_ledger::FileLedger;

/// Loads records and opens the ledger described by `config`.
///
/// A record load failure is logged and yields a directory that reports
/// data as unavailable; status tracking keeps working either way.
pub fn build_directory(config: &Config) -> Directory<FileLedger> {
    let ledger = FileLedger::open(&config.ledger.path);
    match record_store::load_from_config(config) {
        Ok(records) => Directory::new(records, ledger),
        Err(e) => {
            error!(error = %e, "contact data unavailable");
            Directory::unavailable(ledger)
        }
    }
}
