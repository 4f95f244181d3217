//! Chunked delimited-text ingestion.
//!
//! The source is streamed through the `csv` reader and grouped into [`Chunk`]s of roughly
//! `chunk_size` bytes. Chunks are absorbed in source order into an [`IngestionContext`], which
//! owns the column accumulators until the parse completes.
//!
//! Rules:
//!
//! - The first row is the heading row.
//! - Empty lines are skipped and never count as rows.
//! - Short rows are padded with missing cells; cells beyond the headings are ignored.
//! - Each cell goes through [`try_coerce_numeric`] as it is appended. Invalid UTF-8 is decoded
//!   lossily, so a bad byte only affects its own cell.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use csv::{ByteRecord, StringRecord};
use tracing::debug;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawColumn, RawValue};

use super::cancel::{self, CancelToken};
use super::coerce::try_coerce_numeric;
use super::progress::{ProgressPolicy, ProgressTracker};
use super::records::Flattened;

/// Default chunk size in bytes (10 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Delimiters tried, in tie-break order, when none is configured.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b'|', b';'];

/// Upper bound on the bytes buffered while looking for the heading line.
const SNIFF_LIMIT: usize = 64 * 1024;

/// Options for delimited-text parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedOptions {
    /// Field delimiter. `None` guesses it from the heading line.
    pub delimiter: Option<u8>,
    /// Approximate chunk size in bytes. Also the threshold between chunk- and row-granularity
    /// progress.
    pub chunk_size: usize,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A bounded run of parsed rows, in source order.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based chunk number.
    pub index: usize,
    /// Non-empty records in this chunk. The first chunk still includes the heading row.
    pub rows: Vec<StringRecord>,
    /// Byte offset in the source just past the last record.
    pub end_byte: u64,
}

/// Iterator over the [`Chunk`]s of a delimited-text source.
///
/// Yields `None` once the source is exhausted. An error ends the iteration.
pub struct DelimitedChunks<R: Read> {
    reader: csv::Reader<R>,
    chunk_size: u64,
    next_boundary: u64,
    index: usize,
    done: bool,
}

impl<R: Read> DelimitedChunks<R> {
    pub fn new(reader: R, delimiter: u8, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1) as u64;
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);
        Self {
            reader,
            chunk_size,
            next_boundary: chunk_size,
            index: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for DelimitedChunks<R> {
    type Item = IngestionResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::new();
        let mut record = ByteRecord::new();
        loop {
            match self.reader.read_byte_record(&mut record) {
                Ok(true) => {
                    if is_empty_line(&record) {
                        continue;
                    }
                    rows.push(StringRecord::from_byte_record_lossy(record.clone()));
                    let pos = self.reader.position().byte();
                    if pos >= self.next_boundary {
                        while self.next_boundary <= pos {
                            self.next_boundary += self.chunk_size;
                        }
                        break;
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        if rows.is_empty() {
            return None;
        }
        let chunk = Chunk {
            index: self.index,
            rows,
            end_byte: self.reader.position().byte(),
        };
        self.index += 1;
        Some(Ok(chunk))
    }
}

fn is_empty_line(record: &ByteRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(<[u8]>::is_empty)
}

/// Guess the delimiter from the first non-empty line of `sample`.
///
/// Counts each candidate outside double quotes and picks the most frequent one; `,` wins ties
/// and is the fallback when no candidate occurs.
pub fn guess_delimiter(sample: &[u8]) -> u8 {
    let line = sample
        .split(|&b| b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for &b in line {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITER_CANDIDATES.iter().position(|&d| d == b) {
                counts[i] += 1;
            }
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    DELIMITER_CANDIDATES[best]
}

/// Read from `reader` until the first non-empty line is complete, EOF, or [`SNIFF_LIMIT`].
///
/// Remote bodies arrive in arbitrary pieces, so a single read may stop mid-heading.
fn sniff_heading<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut sample = Vec::new();
    let mut buf = [0u8; 8 * 1024];
    while sample.len() < SNIFF_LIMIT && !heading_complete(&sample) {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => sample.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(sample)
}

fn heading_complete(sample: &[u8]) -> bool {
    sample
        .iter()
        .skip_while(|&&b| b == b'\n' || b == b'\r')
        .any(|&b| b == b'\n')
}

/// Column accumulators and progress state owned by one in-flight delimited parse.
#[derive(Debug)]
pub struct IngestionContext {
    policy: ProgressPolicy,
    headings: Option<Vec<String>>,
    columns: Vec<RawColumn>,
    rows: usize,
    chunks: u64,
}

impl IngestionContext {
    pub fn new(policy: ProgressPolicy) -> Self {
        Self {
            policy,
            headings: None,
            columns: Vec::new(),
            rows: 0,
            chunks: 0,
        }
    }

    /// Data rows absorbed so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append one chunk's rows to the column accumulators, reporting progress per the policy.
    pub fn absorb(&mut self, chunk: Chunk, progress: &ProgressTracker<'_>) {
        let mut records = chunk.rows.into_iter();
        if self.headings.is_none() {
            let Some(header) = records.next() else {
                return;
            };
            let headings: Vec<String> = header.iter().map(str::to_string).collect();
            self.columns = headings.iter().map(|_| Vec::new()).collect();
            self.headings = Some(headings);
        }

        let records: Vec<StringRecord> = records.collect();
        let n = records.len();
        let checkpoint = ProgressPolicy::row_checkpoint(n);
        for (j, record) in records.iter().enumerate() {
            if self.policy == ProgressPolicy::Rows && j % checkpoint == 0 {
                progress.report(ProgressPolicy::row_percent(j, n));
            }
            for (i, column) in self.columns.iter_mut().enumerate() {
                column.push(record.get(i).map_or(RawValue::Missing, try_coerce_numeric));
            }
        }
        self.rows += n;
        self.chunks += 1;

        debug!(
            chunk = chunk.index,
            rows = n,
            end_byte = chunk.end_byte,
            total_rows = self.rows,
            "absorbed chunk"
        );

        if let ProgressPolicy::Chunked { total_chunks } = self.policy {
            progress.report(ProgressPolicy::chunk_percent(total_chunks, self.chunks));
        }
    }

    /// Hand the accumulated columns over.
    pub fn finish(self) -> IngestionResult<Flattened> {
        let headings = self
            .headings
            .ok_or_else(|| IngestionError::malformed("delimited source has no heading row"))?;
        Ok((headings, self.columns))
    }
}

/// Parse a delimited-text stream into `(headings, raw_columns)`.
///
/// `byte_size` selects the progress policy (see [`ProgressPolicy::for_source`]); pass `None`
/// for sources of unknown length.
pub fn parse_delimited<R: Read>(
    reader: R,
    byte_size: Option<u64>,
    options: &DelimitedOptions,
    progress: &ProgressTracker<'_>,
    cancel: Option<&CancelToken>,
) -> IngestionResult<Flattened> {
    let mut reader = reader;
    let (delimiter, sample) = match options.delimiter {
        Some(d) => (d, Vec::new()),
        None => {
            let sample = sniff_heading(&mut reader)?;
            (guess_delimiter(&sample), sample)
        }
    };
    // The sniffed bytes are replayed ahead of the rest, so byte positions stay exact.
    let reader = Cursor::new(sample).chain(reader);

    let policy = ProgressPolicy::for_source(byte_size, options.chunk_size);
    debug!(?policy, delimiter = %(delimiter as char), ?byte_size, "parsing delimited text");

    let mut ctx = IngestionContext::new(policy);
    for chunk in DelimitedChunks::new(reader, delimiter, options.chunk_size) {
        cancel::check(cancel)?;
        ctx.absorb(chunk?, progress);
    }
    cancel::check(cancel)?;
    ctx.finish()
}

/// Parse a local delimited-text file; its size drives the progress policy.
pub fn parse_delimited_from_path(
    path: impl AsRef<Path>,
    options: &DelimitedOptions,
    progress: &ProgressTracker<'_>,
    cancel: Option<&CancelToken>,
) -> IngestionResult<Flattened> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    parse_delimited(file, Some(size), options, progress, cancel)
}
