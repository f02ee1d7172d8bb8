//! Record Store: spreadsheet → normalized [`RecordSet`].
//!
//! Loading happens once per process start. The pipeline is:
//!
//! 1. Read the spreadsheet bytes (missing or unreadable → `SourceUnavailable`).
//! 2. If a record cache is configured and was built from the same bytes
//!    (SHA-256) with the same normalization settings, return its records.
//! 3. Decode the first worksheet ([`crate::spreadsheet`]).
//! 4. Match headers against the fixed schema and normalize every value to a
//!    string, with absent values replaced by the configured sentinel.
//! 5. Refresh the cache.
//!
//! The cache only ever short-circuits step 3–4 for identical input, so the
//! spreadsheet stays the single source of records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use contact_directory_core::models::{Record, RecordSet, SCHEMA_FIELDS};
use contact_directory_core::{DirectoryError, Result};

use crate::config::{Config, SchemaMode};
use crate::file_ledger::write_atomic;
use crate::spreadsheet::{self, Sheet};

/// Normalization and caching settings for one load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub schema_mode: SchemaMode,
    pub missing_value: String,
    pub cache_path: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            schema_mode: SchemaMode::Lenient,
            missing_value: contact_directory_core::models::DEFAULT_MISSING_VALUE.to_string(),
            cache_path: None,
        }
    }
}

impl LoadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            schema_mode: config.records.schema_mode,
            missing_value: config.records.missing_value.clone(),
            cache_path: config.cache.path.clone(),
        }
    }
}

/// On-disk form of the record cache.
#[derive(Debug, Serialize, Deserialize)]
struct RecordCache {
    source_sha256: String,
    schema_mode: String,
    missing_value: String,
    generated_at: DateTime<Utc>,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordCache {
    fn matches(&self, source_sha256: &str, opts: &LoadOptions) -> bool {
        self.source_sha256 == source_sha256
            && self.schema_mode == opts.schema_mode.as_str()
            && self.missing_value == opts.missing_value
    }
}

/// Loads the spreadsheet configured in `config`.
pub fn load_from_config(config: &Config) -> Result<RecordSet> {
    load(&config.source.path, &LoadOptions::from_config(config))
}

/// Loads and normalizes the records in `source`.
pub fn load(source: &Path, opts: &LoadOptions) -> Result<RecordSet> {
    let bytes = std::fs::read(source).map_err(|e| DirectoryError::SourceUnavailable {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    let digest = format!("{:x}", Sha256::digest(&bytes));

    if let Some(cache_path) = &opts.cache_path {
        if let Some(set) = read_cache(cache_path, &digest, opts) {
            info!(
                records = set.len(),
                cache = %cache_path.display(),
                "using cached records"
            );
            return Ok(set);
        }
    }

    let sheet =
        spreadsheet::parse_first_sheet(&bytes).map_err(|e| DirectoryError::SourceUnavailable {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    let set = normalize_sheet(&sheet, opts)?;

    info!(
        records = set.len(),
        columns = ?set.columns(),
        source = %source.display(),
        "loaded records from spreadsheet"
    );

    if let Some(cache_path) = &opts.cache_path {
        write_cache(cache_path, &digest, opts, &set);
    }

    Ok(set)
}

/// Applies schema filtering and value normalization to a decoded sheet.
///
/// The first row holds the headers, matched against the schema exactly
/// (case and surrounding whitespace included). Rows with no non-blank cell
/// are skipped.
pub fn normalize_sheet(sheet: &Sheet, opts: &LoadOptions) -> Result<RecordSet> {
    let headers: Vec<Option<String>> = sheet
        .rows
        .first()
        .map(|row| {
            row.iter()
                .map(|c| c.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let position = |name: &str| headers.iter().position(|h| h.as_deref() == Some(name));

    let mut selected: Vec<(String, usize)> = SCHEMA_FIELDS
        .iter()
        .filter_map(|field| position(*field).map(|idx| (field.to_string(), idx)))
        .collect();

    if selected.is_empty() {
        let available: Vec<String> = headers.iter().flatten().cloned().collect();
        match opts.schema_mode {
            SchemaMode::Strict => return Err(DirectoryError::SchemaMismatch { available }),
            SchemaMode::Lenient => {
                warn!(
                    expected = ?SCHEMA_FIELDS,
                    available = ?available,
                    "none of the expected columns were found; keeping all columns"
                );
                for (idx, header) in headers.iter().enumerate() {
                    if let Some(name) = header {
                        if !selected.iter().any(|(n, _)| n == name) {
                            selected.push((name.clone(), idx));
                        }
                    }
                }
            }
        }
    }

    let records: Vec<Record> = sheet
        .rows
        .iter()
        .skip(1)
        .filter(|row| row.iter().any(|c| is_present(c.as_deref())))
        .map(|row| {
            Record::from_pairs(selected.iter().map(|(name, idx)| {
                let value = row
                    .get(*idx)
                    .and_then(|c| c.as_deref())
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(opts.missing_value.as_str());
                (name.clone(), value.to_string())
            }))
        })
        .collect();

    let columns = selected.into_iter().map(|(name, _)| name).collect();
    Ok(RecordSet::new(columns, records))
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn read_cache(path: &Path, digest: &str, opts: &LoadOptions) -> Option<RecordSet> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(cache = %path.display(), error = %e, "record cache unreadable; ignoring");
            return None;
        }
    };
    let cache: RecordCache = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!(cache = %path.display(), error = %e, "record cache malformed; ignoring");
            return None;
        }
    };
    if !cache.matches(digest, opts) {
        info!(cache = %path.display(), "record cache is stale; reloading spreadsheet");
        return None;
    }
    Some(RecordSet::new(cache.columns, cache.records))
}

fn write_cache(path: &Path, digest: &str, opts: &LoadOptions, set: &RecordSet) {
    let cache = RecordCache {
        source_sha256: digest.to_string(),
        schema_mode: opts.schema_mode.as_str().to_string(),
        missing_value: opts.missing_value.clone(),
        generated_at: Utc::now(),
        columns: set.columns().to_vec(),
        records: set.records().to_vec(),
    };
    let result = serde_json::to_string_pretty(&cache)
        .map_err(std::io::Error::from)
        .and_then(|json| write_atomic(path, json.as_bytes()));
    if let Err(e) = result {
        warn!(cache = %path.display(), error = %e, "failed to write record cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[Option<&str>]]) -> Sheet {
        Sheet {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn keeps_schema_fields_in_schema_order() {
        let s = sheet(&[
            &[Some("Name"), Some("Roll"), Some("Email"), Some("Contact")],
            &[Some("Asha"), Some("17"), Some("a@x.com"), Some("123")],
        ]);
        let set = normalize_sheet(&s, &LoadOptions::default()).unwrap();
        assert_eq!(set.columns(), &["Contact", "Email", "Name"]);
        let fields: Vec<(&str, &str)> = set.records()[0].fields().collect();
        assert_eq!(
            fields,
            vec![("Contact", "123"), ("Email", "a@x.com"), ("Name", "Asha")]
        );
    }

    #[test]
    fn headers_must_match_exactly() {
        let s = sheet(&[
            &[Some("Name "), Some("year"), Some("Year")],
            &[Some("Asha"), Some("3"), Some("2021")],
        ]);
        let set = normalize_sheet(&s, &LoadOptions::default()).unwrap();
        assert_eq!(set.columns(), &["Year"]);
        assert_eq!(set.records()[0].get("Year"), Some("2021"));
        assert_eq!(set.records()[0].get("Name"), None);
    }

    #[test]
    fn missing_values_use_sentinel_everywhere() {
        let s = sheet(&[
            &[Some("Name"), Some("Department"), Some("Year")],
            &[Some("Asha"), None, Some("   ")],
            &[None, Some("EE")],
        ]);
        let opts = LoadOptions {
            missing_value: "N/A".to_string(),
            ..LoadOptions::default()
        };
        let set = normalize_sheet(&s, &opts).unwrap();
        let r0 = &set.records()[0];
        assert_eq!(r0.get("Department"), Some("N/A"));
        assert_eq!(r0.get("Year"), Some("N/A"));
        let r1 = &set.records()[1];
        assert_eq!(r1.get("Name"), Some("N/A"));
        assert_eq!(r1.get("Year"), Some("N/A"));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let s = sheet(&[
            &[Some("Name")],
            &[Some("Asha")],
            &[],
            &[None, Some("  ")],
            &[Some("Bina")],
        ]);
        let set = normalize_sheet(&s, &LoadOptions::default()).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn lenient_mismatch_keeps_source_columns() {
        let s = sheet(&[
            &[Some("Full Name"), None, Some("Phone")],
            &[Some("Asha"), Some("x"), Some("123")],
        ]);
        let set = normalize_sheet(&s, &LoadOptions::default()).unwrap();
        assert_eq!(set.columns(), &["Full Name", "Phone"]);
        assert_eq!(set.records()[0].get("Phone"), Some("123"));
    }

    #[test]
    fn strict_mismatch_is_an_error() {
        let s = sheet(&[&[Some("Full Name"), Some("Phone")], &[Some("Asha"), Some("1")]]);
        let opts = LoadOptions {
            schema_mode: SchemaMode::Strict,
            ..LoadOptions::default()
        };
        match normalize_sheet(&s, &opts) {
            Err(DirectoryError::SchemaMismatch { available }) => {
                assert_eq!(available, vec!["Full Name".to_string(), "Phone".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_sheet_is_empty_set() {
        let set = normalize_sheet(&Sheet::default(), &LoadOptions::default()).unwrap();
        assert!(set.is_empty());
        assert!(set.columns().is_empty());
    }

    fn write_workbook(path: &Path, name: &str) {
        use std::io::Write;
        let sheet = format!(
            r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Name</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>{}</t></is></c></row></sheetData></worksheet>"#,
            name
        );
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("xl/worksheets/sheet1.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(sheet.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn cache_is_reused_then_invalidated() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("contacts.xlsx");
        let cache = tmp.path().join("cache/records.json");
        write_workbook(&source, "Asha");
        let opts = LoadOptions {
            cache_path: Some(cache.clone()),
            ..LoadOptions::default()
        };

        let first = load(&source, &opts).unwrap();
        assert_eq!(first.records()[0].get("Name"), Some("Asha"));
        assert!(cache.exists());

        // A tampered cache with a matching digest is served as-is
        let mut doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
        doc["records"][0]["Name"] = serde_json::json!("From Cache");
        std::fs::write(&cache, doc.to_string()).unwrap();
        let cached = load(&source, &opts).unwrap();
        assert_eq!(cached.records()[0].get("Name"), Some("From Cache"));

        // Different normalization settings bypass it
        let sentinel = LoadOptions {
            missing_value: "-".to_string(),
            ..opts.clone()
        };
        let fresh = load(&source, &sentinel).unwrap();
        assert_eq!(fresh.records()[0].get("Name"), Some("Asha"));

        // So does a changed spreadsheet
        write_workbook(&source, "Bina");
        let reloaded = load(&source, &sentinel).unwrap();
        assert_eq!(reloaded.records()[0].get("Name"), Some("Bina"));
    }

    #[test]
    fn missing_source_is_unavailable() {
        let err = load(Path::new("/nonexistent/contacts.xlsx"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DirectoryError::SourceUnavailable { .. }));
    }

    #[test]
    fn non_workbook_is_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("contacts.xlsx");
        std::fs::write(&path, b"name,email\nasha,a@x.com\n").unwrap();
        let err = load(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DirectoryError::SourceUnavailable { .. }));
    }
}
