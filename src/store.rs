//! Holder for the currently active dataset.
//!
//! A new ingestion always builds a fresh [`DataSet`]; installing it swaps the whole snapshot in
//! one step. Readers keep the `Arc` they already hold, so the old dataset is dropped once its last
//! reader lets go.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::IngestionResult;
use crate::ingestion::{ingest, IngestionOptions};
use crate::types::{DataSet, RawSource};

/// The active dataset, replaced wholesale on every successful ingestion.
#[derive(Debug, Default)]
pub struct DatasetSlot {
    current: RwLock<Option<Arc<DataSet>>>,
    generation: AtomicU64,
}

impl DatasetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The installed dataset, if any.
    pub fn current(&self) -> Option<Arc<DataSet>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many datasets have been installed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the active dataset.
    pub fn install(&self, dataset: DataSet) -> Arc<DataSet> {
        let dataset = Arc::new(dataset);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::clone(&dataset));
        self.generation.fetch_add(1, Ordering::SeqCst);
        dataset
    }

    /// Ingest `source` and install the result. A failed ingestion leaves the slot untouched.
    pub fn ingest(&self, source: &RawSource, options: &IngestionOptions) -> IngestionResult<Arc<DataSet>> {
        let dataset = ingest(source, options)?;
        Ok(self.install(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecodeTable;

    fn one_column(v: f64) -> DataSet {
        DataSet::new(vec!["x".into()], vec![vec![v]], vec![DecodeTable::default()])
    }

    #[test]
    fn install_replaces_and_old_readers_keep_their_snapshot() {
        let slot = DatasetSlot::new();
        assert!(slot.current().is_none());

        let first = slot.install(one_column(1.0));
        let second = slot.install(one_column(2.0));

        assert_eq!(slot.generation(), 2);
        assert_eq!(first.columns[0], vec![1.0]);
        assert!(Arc::ptr_eq(&slot.current().unwrap(), &second));
    }

    #[test]
    fn failed_ingest_keeps_previous_dataset() {
        let slot = DatasetSlot::new();
        let ok = RawSource::memory("a.csv", "x\n1\n");
        let installed = slot.ingest(&ok, &IngestionOptions::default()).unwrap();

        let bad = RawSource::memory("a.json", r#"{"satdat": []}"#);
        assert!(slot.ingest(&bad, &IngestionOptions::default()).is_err());

        assert_eq!(slot.generation(), 1);
        assert!(Arc::ptr_eq(&slot.current().unwrap(), &installed));
    }
}
