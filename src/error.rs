use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion functions.
///
/// Only source-level failures appear here. A single cell that fails numeric or date coercion is
/// recovered in place (it becomes a missing/NaN value) and never aborts an ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The structured-record document is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source parsed, but its shape cannot yield headings/columns (empty collection,
    /// missing nested container, no heading row, ...).
    #[error("malformed source: {message}")]
    MalformedSource { message: String },

    /// Remote fetch failed, timed out, or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The ingestion was cancelled through its [`crate::ingestion::CancelToken`].
    #[error("ingestion cancelled")]
    Cancelled,
}

impl IngestionError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSource {
            message: message.into(),
        }
    }
}
