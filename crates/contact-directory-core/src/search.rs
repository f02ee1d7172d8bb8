//! Free-text search over an in-memory record sequence.
//!
//! Matching is a case-insensitive substring test against every field value.
//! There is no tokenization and no ranking: results are a stable filter of
//! the input, so callers see records in spreadsheet order.

use serde::Serialize;

use crate::models::Record;

/// Maximum suggestions returned when the caller does not ask for a limit.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// A field value that matched a partial query, for autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// The full field value.
    pub text: String,
    /// Name of the field the value came from.
    pub field: String,
}

/// Trims and lowercases a query. `None` means "match everything".
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// True if any field value contains `needle`. `needle` must already be
/// lowercased (see [`normalize_query`]).
pub fn record_matches(record: &Record, needle: &str) -> bool {
    record
        .fields()
        .any(|(_, value)| value.to_lowercase().contains(needle))
}

/// Filters `records` to those matching `query`, preserving order.
///
/// An empty or whitespace-only query returns every record.
pub fn search<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    match normalize_query(query) {
        None => records.iter().collect(),
        Some(needle) => records
            .iter()
            .filter(|r| record_matches(r, &needle))
            .collect(),
    }
}

/// Collects distinct matching field values for a partial query.
///
/// Values are visited record by record, field by field; the first occurrence
/// of each distinct text wins. An empty query yields nothing.
pub fn suggest(records: &[Record], query: &str, limit: usize) -> Vec<Suggestion> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };

    let mut out: Vec<Suggestion> = Vec::new();
    for record in records {
        for (field, value) in record.fields() {
            if out.len() >= limit {
                return out;
            }
            if !value.to_lowercase().contains(&needle) {
                continue;
            }
            if out.iter().any(|s| s.text == value) {
                continue;
            }
            out.push(Suggestion {
                text: value.to_string(),
                field: field.to_string(),
            });
        }
    }
    out
}
