use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{IngestionError, IngestionResult};

/// Cooperative cancellation flag for an in-flight ingestion.
///
/// Clones share the same flag. Parsers check it between chunks; a cancelled ingestion fails with
/// [`IngestionError::Cancelled`] and produces no dataset.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`Self::cancel`] has been called.
    pub fn check(&self) -> IngestionResult<()> {
        if self.is_cancelled() {
            Err(IngestionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub(crate) fn check(token: Option<&CancelToken>) -> IngestionResult<()> {
    token.map_or(Ok(()), CancelToken::check)
}
