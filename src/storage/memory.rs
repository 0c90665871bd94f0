//! In-memory batch storage scoped to a single test case run.

use std::sync::{PoisonError, RwLock};

use crate::storage::{Batch, BatchStore};

/// In-memory, append-only collection of received batches.
///
/// A fresh instance is created for every test case so nothing leaks between cases.
#[derive(Default)]
pub struct MemoryBatches {
    batches: RwLock<Vec<Batch>>,
}

impl MemoryBatches {
    /// Create a new empty collection.
    ///
    /// # Returns
    /// Returns a new `MemoryBatches` instance with no batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the collection and return its batches in arrival order.
    pub fn into_batches(self) -> Vec<Batch> {
        self.batches.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BatchStore for MemoryBatches {
    fn append(&self, mut batch: Batch) -> u64 {
        // Sequence numbers are assigned under the lock so they match vector order.
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        let seq = batches.len() as u64;
        batch.seq = seq;
        batches.push(batch);
        seq
    }

    fn snapshot(&self) -> Vec<Batch> {
        self.batches.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn len(&self) -> usize {
        self.batches.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn sample_count(&self) -> usize {
        let batches = self.batches.read().unwrap_or_else(PoisonError::into_inner);
        batches.iter().map(Batch::len).sum()
    }
}
