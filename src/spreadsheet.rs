//! Minimal `.xlsx` reader.
//!
//! Reads the first worksheet of an OOXML workbook into rows of optional
//! string cells. Cell positions come from the `r="B7"` references, so sparse
//! rows keep their columns. Only value decoding lives here; header matching
//! and normalization are [`crate::record_store`]'s job.
//!
//! Cell types:
//!
//! | `t=` | Decoded as |
//! |------|------------|
//! | `s` | shared string |
//! | `inlineStr` | `<is><t>` text |
//! | `str`, `d` | `<v>` text as-is |
//! | `b` | `True` / `False` |
//! | `e` | `None` (error cells such as `#N/A`) |
//! | `n` / absent | number text; integral floats printed without fraction |

use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Largest magnitude printed as an integer when a float has no fraction.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to read spreadsheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid xlsx archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed worksheet XML in {entry}: {message}")]
    Xml { entry: String, message: String },
    #[error("ZIP entry {0} exceeds the size limit")]
    EntryTooLarge(String),
    #[error("workbook contains no worksheets")]
    NoWorksheet,
}

/// Decoded cells of one worksheet. `rows[r][c]` is `None` for empty cells;
/// rows may be shorter than the widest row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

/// Reads the first worksheet of the workbook at `path`.
pub fn read_first_sheet(path: &Path) -> Result<Sheet, SpreadsheetError> {
    let bytes = std::fs::read(path)?;
    parse_first_sheet(&bytes)
}

/// Decodes the first worksheet from workbook bytes.
pub fn parse_first_sheet(bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let first = list_worksheet_names(&archive)
        .into_iter()
        .next()
        .ok_or(SpreadsheetError::NoWorksheet)?;
    let xml = read_zip_entry_bounded(&mut archive, &first, MAX_XML_ENTRY_BYTES)?;
    parse_sheet_xml(&xml, &shared_strings).map_err(|message| SpreadsheetError::Xml {
        entry: first,
        message,
    })
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, SpreadsheetError> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        return Err(SpreadsheetError::EntryTooLarge(name.to_string()));
    }
    Ok(out)
}

/// Worksheet entries sorted by sheet number; `sheet1.xml` is the first tab
/// for workbooks written by Excel, LibreOffice, and openpyxl.
fn list_worksheet_names(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(WORKSHEET_PREFIX) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(WORKSHEET_PREFIX)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Shared string table. Rich-text runs within one `<si>` are concatenated;
/// phonetic hints (`<rPh>`) are skipped. A workbook without the table has
/// no shared strings.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, SpreadsheetError> {
    if !archive.file_names().any(|n| n == SHARED_STRINGS) {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
    let xml_err = |message: String| SpreadsheetError::Xml {
        entry: SHARED_STRINGS.to_string(),
        message,
    };

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" => in_t = !in_phonetic,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_t => {
                let text = te.unescape().map_err(|e| xml_err(e.to_string()))?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Ok(Event::CData(cd)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&cd));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Text,
    Boolean,
    Error,
}

impl CellKind {
    fn from_attr(value: &[u8]) -> Self {
        match value {
            b"s" => CellKind::SharedString,
            b"inlineStr" => CellKind::InlineString,
            b"str" | b"d" => CellKind::Text,
            b"b" => CellKind::Boolean,
            b"e" => CellKind::Error,
            _ => CellKind::Number,
        }
    }
}

struct PendingCell {
    col: usize,
    kind: CellKind,
    raw: String,
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Zero-based column of a cell reference such as `AB12`.
pub(crate) fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: Vec<u8> = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut idx = 0usize;
    for b in letters {
        idx = idx
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A') as usize + 1)?;
    }
    Some(idx - 1)
}

fn parse_sheet_xml(xml: &[u8], shared_strings: &[String]) -> Result<Sheet, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut row: Option<Vec<Option<String>>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut next_col = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_col = 0;
                }
                b"c" => {
                    let col = attr_value(&e, b"r")
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_col);
                    let kind = attr_value(&e, b"t")
                        .map(|t| CellKind::from_attr(t.as_bytes()))
                        .unwrap_or(CellKind::Number);
                    cell = Some(PendingCell {
                        col,
                        kind,
                        raw: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    next_col = attr_value(&e, b"r")
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_col)
                        + 1;
                }
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                if let Some(c) = cell.as_mut() {
                    c.raw.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
                        next_col = c.col + 1;
                        let value = decode_cell(c.kind, &c.raw, shared_strings);
                        if r.len() <= c.col {
                            r.resize(c.col + 1, None);
                        }
                        r[c.col] = value;
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(Sheet { rows })
}

fn decode_cell(kind: CellKind, raw: &str, shared_strings: &[String]) -> Option<String> {
    match kind {
        CellKind::SharedString => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i).cloned()),
        CellKind::InlineString | CellKind::Text => Some(raw.to_string()),
        CellKind::Boolean => match raw.trim() {
            "1" => Some("True".to_string()),
            "0" => Some("False".to_string()),
            _ => None,
        },
        CellKind::Error => None,
        CellKind::Number => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(format_number(trimmed))
            }
        }
    }
}

/// Prints integral floats (`2021.0`, `8.801712345678E12`) as integers and
/// leaves every other number text untouched.
pub(crate) fn format_number(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER => {
            format!("{}", n as i64)
        }
        _ => raw.to_string(),
    }
}
