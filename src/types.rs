//! Core data model types for ingestion.
//!
//! Raw sources are read into [`RawColumn`]s of loosely-typed [`RawValue`]s, which are then
//! interned into an all-numeric [`DataSet`].

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Where the bytes of a dataset come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSource {
    /// A local file. Its byte size is read from file metadata.
    Path(PathBuf),
    /// An in-memory file handle. `name` is used for extension-based routing.
    Memory { name: String, bytes: Vec<u8> },
    /// A remote URL. Always parsed as delimited text; size is not known up front.
    Url(String),
}

impl RawSource {
    /// Interpret a user-supplied string as a URL (`http://`/`https://`) or a local path.
    pub fn parse(arg: &str) -> Self {
        let lower = arg.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(arg.trim().to_string())
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    /// Create an in-memory source.
    pub fn memory(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// The file name used for format routing, if the source has one.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Path(p) => p.file_name().and_then(|s| s.to_str()),
            Self::Memory { name, .. } => Path::new(name).file_name().and_then(|s| s.to_str()),
            Self::Url(_) => None,
        }
    }

    /// Human-readable description for logs and observer events.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Memory { name, bytes } => format!("memory:{name} ({} bytes)", bytes.len()),
            Self::Url(u) => u.clone(),
        }
    }
}

/// A single raw cell, before interning.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Absent/empty cell.
    Missing,
    /// A value that was already numeric (or coerced to a number).
    Number(f64),
    /// Any other value, kept verbatim.
    Text(String),
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Canonical string used as the interning key in categorical columns.
    ///
    /// Numbers use Rust's shortest round-trip formatting (`1` for `1.0`); missing cells map to
    /// the empty string.
    pub fn canonical(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One column of raw cells, aligned 1:1 with rows.
pub type RawColumn = Vec<RawValue>;

/// Code → original string mapping for a categorical column.
///
/// Empty for purely numeric columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DecodeTable {
    values: Vec<String>,
}

impl DecodeTable {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// The original string for `code`, if `code` was assigned.
    pub fn decode(&self, code: f64) -> Option<&str> {
        if code.is_nan() || code < 0.0 || code.fract() != 0.0 {
            return None;
        }
        self.values.get(code as usize).map(String::as_str)
    }

    /// The code assigned to `value`, if it occurred in the column.
    pub fn code_of(&self, value: &str) -> Option<f64> {
        self.values.iter().position(|v| v == value).map(|i| i as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }
}

/// In-memory columnar dataset.
///
/// Every column is numeric; categorical columns carry a non-empty [`DecodeTable`] at the same
/// index. Missing cells in numeric columns are `NaN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSet {
    /// Column names in display order.
    pub headings: Vec<String>,
    /// Column-major value storage, index-aligned with `headings`.
    pub columns: Vec<Vec<f64>>,
    /// Decode tables, index-aligned with `headings`.
    pub decode_tables: Vec<DecodeTable>,
}

impl DataSet {
    /// Create a dataset from already-aligned parts.
    ///
    /// # Panics
    ///
    /// Panics if the three vectors differ in length or the columns differ in row count.
    pub fn new(headings: Vec<String>, columns: Vec<Vec<f64>>, decode_tables: Vec<DecodeTable>) -> Self {
        assert!(
            headings.len() == columns.len() && columns.len() == decode_tables.len(),
            "headings ({}), columns ({}) and decode tables ({}) must align",
            headings.len(),
            columns.len(),
            decode_tables.len()
        );
        if let Some(first) = columns.first() {
            assert!(
                columns.iter().all(|c| c.len() == first.len()),
                "all columns must share the same row count"
            );
        }
        Self {
            headings,
            columns,
            decode_tables,
        }
    }

    /// Number of rows (the shared column length).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_count(&self) -> usize {
        self.headings.len()
    }

    /// Returns the index of the first heading equal to `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.headings.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index_of(name).map(|i| self.columns[i].as_slice())
    }

    pub fn decode_table(&self, name: &str) -> Option<&DecodeTable> {
        self.index_of(name).map(|i| &self.decode_tables[i])
    }

    /// Whether the column at `index` was interned as categorical.
    pub fn is_categorical(&self, index: usize) -> bool {
        self.decode_tables.get(index).is_some_and(|t| !t.is_empty())
    }

    /// The original string behind a categorical cell.
    pub fn decoded(&self, index: usize, row: usize) -> Option<&str> {
        let code = *self.columns.get(index)?.get(row)?;
        self.decode_tables.get(index)?.decode(code)
    }
}
