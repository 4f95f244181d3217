//! Progress reporting for long-running ingestions.
//!
//! A [`ProgressReporter`] receives integer percentages in `0..=100`. The final call on success is
//! always `100`; nothing is promised on failure.
//!
//! How often intermediate values arrive depends on the [`ProgressPolicy`]:
//!
//! - sources larger than one chunk report once per chunk against an estimated chunk count,
//! - sources that fit in one chunk report roughly once per 1% of its rows,
//! - sources of unknown size (remote URLs) report only the start and the completion.
//!
//! The row-granularity values are rounded against the chunk's row count and may repeat or stop
//! short of 100; treat the completion call as authoritative.

use std::sync::Mutex;

use tracing::debug;

/// Receives progress percentages.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressReporter for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Logs progress at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, percent: u8) {
        debug!(percent, "ingestion progress");
    }
}

/// How progress is derived while parsing delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPolicy {
    /// Once per chunk: `min(100, round(done / total_chunks * 100))`.
    Chunked { total_chunks: u64 },
    /// Row by row within each chunk, about once per 1% of rows.
    Rows,
    /// Only start and completion.
    CompletionOnly,
}

impl ProgressPolicy {
    /// Pick the policy for a source of `byte_size` bytes read in chunks of `chunk_size` bytes.
    pub fn for_source(byte_size: Option<u64>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1) as u64;
        match byte_size {
            None => Self::CompletionOnly,
            Some(size) if size > chunk_size => Self::Chunked {
                total_chunks: size / chunk_size,
            },
            Some(_) => Self::Rows,
        }
    }

    /// Percentage after `chunks_done` chunks, for [`ProgressPolicy::Chunked`].
    pub fn chunk_percent(total_chunks: u64, chunks_done: u64) -> u8 {
        if total_chunks == 0 {
            return 100;
        }
        let pct = (chunks_done as f64 / total_chunks as f64 * 100.0).round();
        pct.min(100.0) as u8
    }

    /// Row interval between reports for a chunk of `rows` rows, for [`ProgressPolicy::Rows`].
    pub fn row_checkpoint(rows: usize) -> usize {
        ((rows as f64 / 100.0).round() as usize).max(1)
    }

    /// Percentage at row `index` of a chunk of `rows` rows.
    pub fn row_percent(index: usize, rows: usize) -> u8 {
        if rows == 0 {
            return 100;
        }
        let pct = (index as f64 / rows as f64 * 100.0).round();
        pct.min(100.0) as u8
    }
}

/// Wraps a reporter, clamping values and dropping consecutive duplicates.
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    last: Mutex<Option<u8>>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            last: Mutex::new(None),
        }
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(percent) {
            return;
        }
        *last = Some(percent);
        self.reporter.report(percent);
    }

    /// The last value forwarded to the reporter.
    pub fn last(&self) -> Option<u8> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_selection() {
        assert_eq!(ProgressPolicy::for_source(None, 10), ProgressPolicy::CompletionOnly);
        assert_eq!(ProgressPolicy::for_source(Some(10), 10), ProgressPolicy::Rows);
        assert_eq!(
            ProgressPolicy::for_source(Some(35), 10),
            ProgressPolicy::Chunked { total_chunks: 3 }
        );
    }

    #[test]
    fn chunk_percent_is_capped() {
        assert_eq!(ProgressPolicy::chunk_percent(3, 1), 33);
        assert_eq!(ProgressPolicy::chunk_percent(3, 2), 67);
        assert_eq!(ProgressPolicy::chunk_percent(3, 3), 100);
        // The estimate floors, so a fourth chunk can show up.
        assert_eq!(ProgressPolicy::chunk_percent(3, 4), 100);
    }

    #[test]
    fn row_checkpoints() {
        assert_eq!(ProgressPolicy::row_checkpoint(1_000), 10);
        assert_eq!(ProgressPolicy::row_checkpoint(149), 1);
        assert_eq!(ProgressPolicy::row_checkpoint(10), 1);
        assert_eq!(ProgressPolicy::row_checkpoint(0), 1);
        assert_eq!(ProgressPolicy::row_percent(5, 10), 50);
        assert_eq!(ProgressPolicy::row_percent(999, 1_000), 100);
    }

    #[test]
    fn tracker_drops_repeats() {
        let seen = Mutex::new(Vec::new());
        let reporter = |p: u8| seen.lock().unwrap().push(p);
        let tracker = ProgressTracker::new(&reporter);
        for p in [0, 0, 10, 10, 150] {
            tracker.report(p);
        }
        assert_eq!(tracker.last(), Some(100));
        drop(tracker);
        assert_eq!(seen.into_inner().unwrap(), vec![0, 10, 100]);
    }
}
