//! CSV rendering of search results.

use crate::models::Record;

/// Renders `records` as CSV with a header row of `columns`.
///
/// Lines are joined with `\n`. Values containing a comma, quote, or line
/// break are quoted, with embedded quotes doubled. A record without one of
/// the columns gets an empty cell.
pub fn to_csv<'a, I>(columns: &[String], records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut lines: Vec<String> = Vec::new();
    lines.push(
        columns
            .iter()
            .map(|c| escape_field(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|c| escape_field(record.get(c).unwrap_or_default()))
            .collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_and_rows() {
        let records = vec![
            Record::from_pairs([("Name", "Asha"), ("Department", "CS")]),
            Record::from_pairs([("Name", "Bina"), ("Department", "EE")]),
        ];
        let csv = to_csv(&cols(&["Name", "Department"]), &records);
        assert_eq!(csv, "Name,Department\nAsha,CS\nBina,EE");
    }

    #[test]
    fn quotes_special_values() {
        let records = vec![Record::from_pairs([
            ("Name", "Rahman, Asha"),
            ("Hall Name", "The \"North\" Hall"),
        ])];
        let csv = to_csv(&cols(&["Name", "Hall Name"]), &records);
        assert_eq!(
            csv,
            "Name,Hall Name\n\"Rahman, Asha\",\"The \"\"North\"\" Hall\""
        );
    }

    #[test]
    fn missing_column_is_empty_cell() {
        let records = vec![Record::from_pairs([("Name", "Asha")])];
        let csv = to_csv(&cols(&["Name", "Year"]), &records);
        assert_eq!(csv, "Name,Year\nAsha,");
    }

    #[test]
    fn no_records_is_header_only() {
        let csv = to_csv(&cols(&["Name"]), std::iter::empty());
        assert_eq!(csv, "Name");
    }
}
