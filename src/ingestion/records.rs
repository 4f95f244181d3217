//! Structured-record (nested JSON) ingestion.
//!
//! Expected document shape:
//!
//! ```json
//! { "satdat": [
//!     { "id": 1, "created": "2016-01-01T00:00:00Z", "result": { "temp": 12.5 } },
//!     { "id": 2, "created": "2016-01-02T00:00:00Z", "result": { "temp": 13.0 } }
//! ] }
//! ```
//!
//! Headings are the first record's keys (minus the nested key), followed by the nested object's
//! keys prefixed with `"{nested_key}."`. The whole document is materialized before flattening.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawColumn, RawValue};

/// Names of the collection and nested container in a structured-record document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Top-level key holding the array of records.
    pub collection_key: String,
    /// Per-record key holding the nested object to flatten.
    pub nested_key: String,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            collection_key: "satdat".to_string(),
            nested_key: "result".to_string(),
        }
    }
}

/// Flattened headings and raw columns.
pub type Flattened = (Vec<String>, Vec<RawColumn>);

/// Read and flatten a structured-record file.
pub fn ingest_records_from_path(path: impl AsRef<Path>, layout: &RecordLayout) -> IngestionResult<Flattened> {
    let bytes = fs::read(path)?;
    ingest_records_from_slice(&bytes, layout)
}

/// Read and flatten a structured-record document from a reader.
pub fn ingest_records_from_reader<R: Read>(mut reader: R, layout: &RecordLayout) -> IngestionResult<Flattened> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    ingest_records_from_slice(&bytes, layout)
}

/// Parse and flatten a structured-record document held in memory.
pub fn ingest_records_from_str(input: &str, layout: &RecordLayout) -> IngestionResult<Flattened> {
    ingest_records_from_slice(input.as_bytes(), layout)
}

fn ingest_records_from_slice(input: &[u8], layout: &RecordLayout) -> IngestionResult<Flattened> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestionError::malformed("structured-record input is empty"));
    }
    let doc: Value = serde_json::from_slice(input)?;
    flatten_records(&doc, layout)
}

/// Flatten a parsed document into `(headings, raw_columns)`.
///
/// Fails with [`IngestionError::MalformedSource`] when the collection is absent or empty, or
/// when the first record does not allow field discovery. A record whose nested object is absent
/// (or lacks a key) yields missing cells instead.
pub fn flatten_records(doc: &Value, layout: &RecordLayout) -> IngestionResult<Flattened> {
    let records = doc
        .get(&layout.collection_key)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            IngestionError::malformed(format!(
                "expected a top-level object with an array under '{}'",
                layout.collection_key
            ))
        })?;

    let first = records.first().ok_or_else(|| {
        IngestionError::malformed(format!(
            "collection '{}' is empty; cannot discover headings",
            layout.collection_key
        ))
    })?;
    let first = first
        .as_object()
        .ok_or_else(|| IngestionError::malformed("record 0 is not a json object"))?;

    let scalar_keys: Vec<&str> = first
        .keys()
        .map(String::as_str)
        .filter(|k| *k != layout.nested_key)
        .collect();
    let nested_keys: Vec<&str> = first
        .get(&layout.nested_key)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            IngestionError::malformed(format!(
                "record 0 has no '{}' object; cannot discover nested headings",
                layout.nested_key
            ))
        })?
        .keys()
        .map(String::as_str)
        .collect();

    let mut headings: Vec<String> = scalar_keys.iter().map(|k| k.to_string()).collect();
    headings.extend(nested_keys.iter().map(|k| format!("{}.{k}", layout.nested_key)));

    let mut columns: Vec<RawColumn> = headings
        .iter()
        .map(|_| Vec::with_capacity(records.len()))
        .collect();

    let empty = Map::new();
    for (idx, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or_else(|| IngestionError::malformed(format!("record {idx} is not a json object")))?;
        let nested = obj
            .get(&layout.nested_key)
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let (scalar_cols, nested_cols) = columns.split_at_mut(scalar_keys.len());
        for (key, col) in scalar_keys.iter().zip(scalar_cols) {
            col.push(raw_from_json(obj.get(*key)));
        }
        for (key, col) in nested_keys.iter().zip(nested_cols) {
            col.push(raw_from_json(nested.get(*key)));
        }
    }

    Ok((headings, columns))
}

fn raw_from_json(v: Option<&Value>) -> RawValue {
    match v {
        None | Some(Value::Null) => RawValue::Missing,
        Some(Value::Number(n)) => n.as_f64().map_or(RawValue::Missing, RawValue::Number),
        Some(Value::String(s)) => RawValue::Text(s.clone()),
        Some(Value::Bool(b)) => RawValue::Text(b.to_string()),
        Some(other) => RawValue::Text(other.to_string()),
    }
}
