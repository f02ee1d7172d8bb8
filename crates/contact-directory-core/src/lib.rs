//! # Contact Directory Core
//!
//! Shared, I/O-free logic for Contact Directory: the record model, record
//! identity, contact status, search, the status ledger abstraction, and the
//! [`directory::Directory`] facade that transport layers call into.
//!
//! This crate contains no tokio, filesystem, or spreadsheet dependencies.
//! Loading records and persisting the ledger are the application's job; it
//! hands the results to a [`directory::Directory`] and talks only to that.

pub mod directory;
pub mod error;
pub mod export;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod search;
pub mod status;

pub use directory::Directory;
pub use error::{DirectoryError, Result};
pub use identity::RecordIdentity;
pub use ledger::{memory::InMemoryLedger, StatusLedger};
pub use models::{Record, RecordSet};
pub use status::ContactStatus;
