//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest`] (from [`unified`]) which:
//!
//! - routes a [`crate::types::RawSource`] to the delimited-text or structured-record reader
//! - normalizes designated timestamp headings and interns every column into a
//!   [`crate::types::DataSet`]
//! - reports progress to a [`ProgressReporter`] and the outcome to an [`IngestionObserver`]
//!
//! The building blocks are also available directly:
//! - [`coerce`]: per-cell numeric coercion
//! - [`delimited`]: chunked delimited-text parsing
//! - [`records`]: structured-record flattening
//! - [`timestamp`]: epoch-second normalization
//! - [`interner`]: categorical interning

pub mod cancel;
pub mod coerce;
pub mod delimited;
pub mod interner;
pub mod observability;
pub mod progress;
pub mod records;
pub mod remote;
pub mod timestamp;
pub mod unified;

pub use cancel::CancelToken;
pub use coerce::try_coerce_numeric;
pub use delimited::{DelimitedChunks, DelimitedOptions, IngestionContext, DEFAULT_CHUNK_SIZE};
pub use interner::{intern_column, intern_columns, InternedColumn};
pub use observability::{
    CompositeObserver, FileObserver, IngestionAttempt, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use progress::{NoProgress, ProgressPolicy, ProgressReporter, ProgressTracker, TracingProgress};
pub use records::RecordLayout;
pub use timestamp::{normalize_timestamps, parse_date_to_epoch_seconds};
pub use unified::{ingest, ingest_with_stats, IngestionFormat, IngestionOptions, IngestionRequest};
