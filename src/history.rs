//! Accumulated build history.
//!
//! The report publishes history as numbered shards `01..kfiles`. The store
//! keeps them in shard order and a flattened copy whose positions define the
//! discovery order of each record.

use crate::model::BuildResultRecord;

/// True when the summary's shard count differs from the last one observed.
///
/// Growth means new history within the run. A drop means a new run started
/// and numbered its shards from 1 again, so the stored shards are stale.
pub fn shards_changed(observed: Option<usize>, kfiles: usize) -> bool {
    match observed {
        None => kfiles > 0,
        Some(seen) => kfiles != seen,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    shards: Vec<Vec<BuildResultRecord>>,
    records: Vec<BuildResultRecord>,
    observed_kfiles: Option<usize>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_refresh(&self, kfiles: usize) -> bool {
        shards_changed(self.observed_kfiles, kfiles)
    }

    pub fn observed_kfiles(&self) -> Option<usize> {
        self.observed_kfiles
    }

    /// Stores one shard at its 1-based position, replacing whatever was there.
    pub fn ingest(&mut self, shard_index: usize, records: Vec<BuildResultRecord>) {
        if shard_index == 0 {
            tracing::warn!("ignoring history shard with index 0");
            return;
        }
        if self.shards.len() < shard_index {
            self.shards.resize_with(shard_index, Vec::new);
        }
        self.shards[shard_index - 1] = records;
        self.observed_kfiles = Some(self.observed_kfiles.unwrap_or(0).max(shard_index));
        self.flatten();
    }

    /// Replaces the whole shard list with `shards` (shard 1 first).
    pub fn replace(&mut self, shards: Vec<Vec<BuildResultRecord>>) {
        self.observed_kfiles = Some(shards.len());
        self.shards = shards;
        self.flatten();
    }

    fn flatten(&mut self) {
        self.records = self.shards.iter().flatten().cloned().collect();
    }

    /// Every record in discovery order: shard order, then order within a shard.
    pub fn all_records(&self) -> &[BuildResultRecord] {
        &self.records
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
