//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest`], which reads a [`RawSource`] into an interned
//! [`DataSet`]:
//!
//! - URLs are always fetched and parsed as delimited text.
//! - Local sources are routed by extension (`.json` → structured records, anything else →
//!   delimited text) unless [`IngestionOptions::format`] is set.
//! - Designated timestamp headings are normalized, then every column is interned.
//! - Progress goes to [`IngestionOptions::progress`]; the outcome goes to
//!   [`IngestionOptions::observer`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{IngestionError, IngestionResult};
use crate::store::DatasetSlot;
use crate::types::{DataSet, RawSource};

use super::cancel::{self, CancelToken};
use super::delimited::{self, DelimitedOptions};
use super::interner;
use super::observability::{IngestionAttempt, IngestionObserver, IngestionSeverity, IngestionStats};
use super::progress::{NoProgress, ProgressReporter, ProgressTracker};
use super::records::{self, Flattened, RecordLayout};
use super::remote;
use super::timestamp::{self, DEFAULT_TIMESTAMP_HEADINGS};

/// Supported source shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Delimited text (CSV, TSV, ...) with a heading row, streamed in chunks.
    Delimited,
    /// A nested JSON document with a record collection, fully materialized.
    StructuredRecords,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    ///
    /// `json` selects structured records; every other extension is delimited text.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Self::StructuredRecords,
            _ => Self::Delimited,
        }
    }

    /// Route a source by file name. Names without an extension are delimited text.
    pub fn from_file_name(name: &str) -> Self {
        Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map_or(Self::Delimited, Self::from_extension)
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, local sources are routed by extension. Ignored for URLs.
    pub format: Option<IngestionFormat>,
    /// Delimited-text options (delimiter, chunk size).
    pub delimited: DelimitedOptions,
    /// Structured-record layout (collection and nested keys).
    pub records: RecordLayout,
    /// Headings rewritten to epoch seconds before interning.
    pub timestamp_headings: Vec<String>,
    /// Timeout for remote fetches.
    pub fetch_timeout: Duration,
    /// Intern columns on the rayon pool.
    pub parallel_interning: bool,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressReporter>>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
    /// Optional cancellation flag, checked between chunks.
    pub cancel: Option<CancelToken>,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("delimited", &self.delimited)
            .field("records", &self.records)
            .field("timestamp_headings", &self.timestamp_headings)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("parallel_interning", &self.parallel_interning)
            .field("progress_set", &self.progress.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("cancel_set", &self.cancel.is_some())
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            delimited: DelimitedOptions::default(),
            records: RecordLayout::default(),
            timestamp_headings: DEFAULT_TIMESTAMP_HEADINGS.iter().map(|s| s.to_string()).collect(),
            fetch_timeout: remote::DEFAULT_FETCH_TIMEOUT,
            parallel_interning: true,
            progress: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            cancel: None,
        }
    }
}

/// Ingest a source into an interned [`DataSet`].
///
/// The progress sink gets `0` at the start and `100` on success. When an observer is
/// configured, this function reports:
///
/// - `on_success` on success, with [`IngestionStats`]
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```
/// use columnar_ingest::ingestion::{ingest, IngestionOptions};
/// use columnar_ingest::types::RawSource;
///
/// # fn main() -> Result<(), columnar_ingest::IngestionError> {
/// let src = RawSource::memory("points.csv", "x,kind\n1.5,cat\n2.5,dog\n3.0,cat\n");
/// let ds = ingest(&src, &IngestionOptions::default())?;
///
/// assert_eq!(ds.headings, vec!["x", "kind"]);
/// assert_eq!(ds.columns[0], vec![1.5, 2.5, 3.0]);
/// assert_eq!(ds.columns[1], vec![0.0, 1.0, 0.0]);
/// assert_eq!(ds.decoded(1, 1), Some("dog"));
/// # Ok(())
/// # }
/// ```
///
/// ## Progress and cancellation
///
/// ```no_run
/// use std::sync::Arc;
///
/// use columnar_ingest::ingestion::{ingest, CancelToken, IngestionOptions, TracingObserver};
/// use columnar_ingest::types::RawSource;
///
/// # fn main() -> Result<(), columnar_ingest::IngestionError> {
/// let cancel = CancelToken::new();
/// let opts = IngestionOptions {
///     progress: Some(Arc::new(|p: u8| eprint!("\r{p:>3}%"))),
///     observer: Some(Arc::new(TracingObserver)),
///     cancel: Some(cancel.clone()),
///     ..Default::default()
/// };
/// let ds = ingest(&RawSource::parse("https://example.com/big.csv"), &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest(source: &RawSource, options: &IngestionOptions) -> IngestionResult<DataSet> {
    ingest_with_stats(source, options).map(|(ds, _)| ds)
}

/// Same as [`ingest`], also returning the [`IngestionStats`] handed to the observer.
pub fn ingest_with_stats(
    source: &RawSource,
    options: &IngestionOptions,
) -> IngestionResult<(DataSet, IngestionStats)> {
    let started = Instant::now();
    let attempt = IngestionAttempt {
        source: source.describe(),
        format: resolve_format(source, options),
    };

    let reporter: &dyn ProgressReporter = match options.progress.as_deref() {
        Some(p) => p,
        None => &NoProgress,
    };
    let tracker = ProgressTracker::new(reporter);
    tracker.report(0);

    let result = read_and_intern(source, attempt.format, options, &tracker).map(|(ds, invalid_cells)| {
        let stats = IngestionStats {
            rows: ds.row_count(),
            columns: ds.column_count(),
            categorical_columns: (0..ds.column_count()).filter(|&i| ds.is_categorical(i)).count(),
            invalid_cells,
            elapsed: started.elapsed(),
        };
        (ds, stats)
    });

    match &result {
        Ok((_, stats)) => {
            tracker.report(100);
            if let Some(obs) = options.observer.as_ref() {
                obs.on_success(&attempt, *stats);
            }
        }
        Err(e) => {
            if let Some(obs) = options.observer.as_ref() {
                let sev = severity_for_error(e);
                obs.on_failure(&attempt, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&attempt, sev, e);
                }
            }
        }
    }

    result
}

fn resolve_format(source: &RawSource, options: &IngestionOptions) -> IngestionFormat {
    match source {
        RawSource::Url(_) => IngestionFormat::Delimited,
        _ => options.format.unwrap_or_else(|| {
            source
                .file_name()
                .map_or(IngestionFormat::Delimited, IngestionFormat::from_file_name)
        }),
    }
}

/// Read `(headings, raw_columns)`, normalize timestamps and intern.
///
/// Returns the dataset and the number of invalid timestamp cells.
fn read_and_intern(
    source: &RawSource,
    format: IngestionFormat,
    options: &IngestionOptions,
    tracker: &ProgressTracker<'_>,
) -> IngestionResult<(DataSet, usize)> {
    let cancel = options.cancel.as_ref();
    let (headings, mut columns) = read_raw(source, format, options, tracker)?;
    cancel::check(cancel)?;

    let report = timestamp::normalize_timestamps(&headings, &mut columns, &options.timestamp_headings);
    let (columns, decode_tables): (Vec<_>, Vec<_>) = interner::intern_columns(columns, options.parallel_interning)
        .into_iter()
        .map(|c| (c.values, c.decode))
        .unzip();

    Ok((DataSet::new(headings, columns, decode_tables), report.invalid_cells()))
}

fn read_raw(
    source: &RawSource,
    format: IngestionFormat,
    options: &IngestionOptions,
    tracker: &ProgressTracker<'_>,
) -> IngestionResult<Flattened> {
    let cancel = options.cancel.as_ref();
    match (source, format) {
        (RawSource::Url(url), _) => {
            let body = remote::fetch(url, options.fetch_timeout)?;
            delimited::parse_delimited(body, None, &options.delimited, tracker, cancel).map_err(remote::body_failure)
        }
        (RawSource::Path(path), IngestionFormat::Delimited) => {
            delimited::parse_delimited_from_path(path, &options.delimited, tracker, cancel)
        }
        (RawSource::Path(path), IngestionFormat::StructuredRecords) => {
            records::ingest_records_from_path(path, &options.records)
        }
        (RawSource::Memory { bytes, .. }, IngestionFormat::Delimited) => delimited::parse_delimited(
            bytes.as_slice(),
            Some(bytes.len() as u64),
            &options.delimited,
            tracker,
            cancel,
        ),
        (RawSource::Memory { bytes, .. }, IngestionFormat::StructuredRecords) => {
            records::ingest_records_from_reader(bytes.as_slice(), &options.records)
        }
    }
}

fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) | IngestionError::Transport(_) => IngestionSeverity::Critical,
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::Json(err) => {
            if err.is_io() {
                IngestionSeverity::Critical
            } else {
                IngestionSeverity::Error
            }
        }
        IngestionError::MalformedSource { .. } => IngestionSeverity::Error,
        IngestionError::Cancelled => IngestionSeverity::Warning,
    }
}

/// An owned ingestion request: a source plus the options to read it with.
#[derive(Clone)]
pub struct IngestionRequest {
    pub source: RawSource,
    pub options: IngestionOptions,
}

impl fmt::Debug for IngestionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionRequest")
            .field("source", &self.source.describe())
            .field("options", &self.options)
            .finish()
    }
}

impl IngestionRequest {
    pub fn new(source: RawSource, options: IngestionOptions) -> Self {
        Self { source, options }
    }

    /// Execute the request by calling [`ingest`].
    pub fn run(&self) -> IngestionResult<DataSet> {
        ingest(&self.source, &self.options)
    }

    /// Execute the request and install the result into `slot`.
    ///
    /// On failure the slot keeps whatever it held before.
    pub fn run_into(&self, slot: &DatasetSlot) -> IngestionResult<Arc<DataSet>> {
        let ds = self.run()?;
        Ok(slot.install(ds))
    }
}
