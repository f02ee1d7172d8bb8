//! Error taxonomy shared by the core and the application crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by loading, status updates, and facade queries.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The spreadsheet could not be found, opened, or decoded.
    #[error("spreadsheet '{}' is unavailable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// None of the expected columns are present in the spreadsheet.
    #[error("none of the expected columns were found (available: {})", available.join(", "))]
    SchemaMismatch { available: Vec<String> },

    /// The status document could not be written.
    #[error("failed to persist status document '{}': {reason}", path.display())]
    PersistenceError { path: PathBuf, reason: String },

    /// A status value outside `contacted` / `not_contacted`.
    #[error("invalid contact status '{0}' (expected 'contacted' or 'not_contacted')")]
    InvalidStatus(String),

    #[error("record id must not be empty")]
    InvalidRecordId,

    /// Records were never loaded, so there is nothing to query.
    #[error("data not loaded")]
    DataUnavailable,
}

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;
