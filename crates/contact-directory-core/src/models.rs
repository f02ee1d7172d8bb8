//! Core data models: the fixed contact schema, [`Record`], and [`RecordSet`].

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const FIELD_CONTACT: &str = "Contact";
pub const FIELD_DEPARTMENT: &str = "Department";
pub const FIELD_EMAIL: &str = "Email";
pub const FIELD_HALL_NAME: &str = "Hall Name";
pub const FIELD_NAME: &str = "Name";
pub const FIELD_YEAR: &str = "Year";

/// The fixed schema, in the order fields appear in every [`Record`].
pub const SCHEMA_FIELDS: [&str; 6] = [
    FIELD_CONTACT,
    FIELD_DEPARTMENT,
    FIELD_EMAIL,
    FIELD_HALL_NAME,
    FIELD_NAME,
    FIELD_YEAR,
];

/// Sentinel used for absent or empty source values unless configured otherwise.
pub const DEFAULT_MISSING_VALUE: &str = "";

/// One normalized contact entry: an ordered mapping of field name to value.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from `(name, value)` pairs. A repeated name keeps its
    /// first position and takes the last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.insert(k, v);
        }
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates `(name, value)` pairs in field order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            record.insert(k, v);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// The immutable result of one load: column order plus the record sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Contact progress totals over the loaded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub total: usize,
    pub contacted: usize,
    pub not_contacted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position() {
        let mut r = Record::from_pairs([("Name", "Asha"), ("Email", "a@x.com")]);
        r.insert("Name", "Asha K");
        let names: Vec<&str> = r.field_names().collect();
        assert_eq!(names, vec!["Name", "Email"]);
        assert_eq!(r.get("Name"), Some("Asha K"));
    }

    #[test]
    fn serializes_in_field_order() {
        let r = Record::from_pairs([("Name", "Asha"), ("Contact", "123"), ("Email", "a@x.com")]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Name":"Asha","Contact":"123","Email":"a@x.com"}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn missing_field_is_none() {
        let r = Record::from_pairs([("Name", "Asha")]);
        assert_eq!(r.get("Year"), None);
        assert_eq!(r.len(), 1);
    }
}
