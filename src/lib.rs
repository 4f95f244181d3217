//! `columnar-ingest` turns a tabular dataset (delimited text, or a nested structured-record JSON
//! document) into an all-numeric, column-major [`types::DataSet`].
//!
//! The primary entrypoint is [`ingestion::ingest`], which routes a [`types::RawSource`] by kind
//! and file extension (or you can force a format via [`ingestion::IngestionOptions`]).
//!
//! ## What you can ingest
//!
//! - **Delimited text** (`.csv`, `.tsv`, anything that is not `.json`, and every URL): streamed
//!   in bounded chunks. The first row is the heading row; empty lines are skipped; the delimiter
//!   is guessed from the heading line unless configured.
//! - **Structured records** (`.json`): a document `{ "satdat": [ {..., "result": {...}}, ... ] }`.
//!   Headings are the record keys followed by `result.`-prefixed nested keys. The collection and
//!   nested keys are configurable via [`ingestion::RecordLayout`].
//!
//! ## What comes out
//!
//! - `headings`: column names in source order.
//! - `columns`: one `Vec<f64>` per heading, all the same length.
//! - `decode_tables`: empty for numeric columns; for a column containing any string, every cell
//!   is replaced by an integer code (first-occurrence order from 0) and the table maps codes back.
//!
//! The `created` and `datetime` headings (configurable) are converted to epoch seconds first.
//!
//! ```rust
//! use columnar_ingest::ingestion::{ingest, IngestionOptions};
//! use columnar_ingest::types::RawSource;
//!
//! # fn main() -> Result<(), columnar_ingest::IngestionError> {
//! let doc = r#"{"satdat": [
//!     {"id": 1, "created": "1970-01-01T00:00:10Z", "result": {"temp": 12.5}},
//!     {"id": 2, "created": "1970-01-01T00:00:20Z", "result": {"temp": 13.0}}
//! ]}"#;
//! let ds = ingest(&RawSource::memory("obs.json", doc), &IngestionOptions::default())?;
//!
//! assert_eq!(ds.headings, vec!["id", "created", "result.temp"]);
//! assert_eq!(ds.column("created"), Some(&[10.0, 20.0][..]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: unified entrypoint, parsers, interning, progress and observers
//! - [`types`]: raw sources, raw cells and the columnar dataset
//! - [`store`]: the active-dataset slot
//! - [`error`]: error types used across ingestion

pub mod error;
pub mod ingestion;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
