//! Outcome observers for ingestion attempts.
//!
//! Progress is reported through [`super::progress::ProgressReporter`]; observers hear about the
//! end result only: success with [`IngestionStats`], or failure with a severity.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::IngestionError;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, or caller-initiated such as cancellation).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (I/O or transport failures).
    Critical,
}

/// Identifies an ingestion attempt in observer callbacks.
#[derive(Debug, Clone)]
pub struct IngestionAttempt {
    /// Human-readable source description (path, memory name, or URL).
    pub source: String,
    /// Format the source was routed to.
    pub format: IngestionFormat,
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    /// Number of ingested rows.
    pub rows: usize,
    /// Number of columns.
    pub columns: usize,
    /// Columns that were interned as categorical.
    pub categorical_columns: usize,
    /// Timestamp cells that could not be parsed and were stored as NaN.
    pub invalid_cells: usize,
    /// Wall time from start to finished dataset.
    pub elapsed: Duration,
}

/// Observer interface for ingestion outcomes.
pub trait IngestionObserver: Send + Sync {
    /// Called when ingestion succeeds.
    fn on_success(&self, _attempt: &IngestionAttempt, _stats: IngestionStats) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _attempt: &IngestionAttempt, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(attempt, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, attempt: &IngestionAttempt, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(attempt, stats);
        }
    }

    fn on_failure(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(attempt, severity, error);
        }
    }

    fn on_alert(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(attempt, severity, error);
        }
    }
}

/// Emits ingestion outcomes as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, attempt: &IngestionAttempt, stats: IngestionStats) {
        info!(
            format = ?attempt.format,
            source = %attempt.source,
            rows = stats.rows,
            columns = stats.columns,
            categorical = stats.categorical_columns,
            invalid_cells = stats.invalid_cells,
            elapsed = ?stats.elapsed,
            "ingestion finished"
        );
    }

    fn on_failure(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        if severity >= IngestionSeverity::Error {
            error!(?severity, format = ?attempt.format, source = %attempt.source, %error, "ingestion failed");
        } else {
            warn!(?severity, format = ?attempt.format, source = %attempt.source, %error, "ingestion stopped");
        }
    }

    fn on_alert(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        error!(alert = true, ?severity, format = ?attempt.format, source = %attempt.source, %error, "ingestion alert");
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, attempt: &IngestionAttempt, stats: IngestionStats) {
        self.append_line(&format!(
            "ok format={:?} source={} rows={} columns={} categorical={} invalid_cells={}",
            attempt.format, attempt.source, stats.rows, stats.columns, stats.categorical_columns, stats.invalid_cells
        ));
    }

    fn on_failure(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "fail severity={severity:?} format={:?} source={} err={error}",
            attempt.format, attempt.source
        ));
    }

    fn on_alert(&self, attempt: &IngestionAttempt, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "ALERT severity={severity:?} format={:?} source={} err={error}",
            attempt.format, attempt.source
        ));
    }
}
