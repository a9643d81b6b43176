// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    merge::{MergedIter, SubIter},
    table::TableReader,
    Error, HashId, Record, Result,
};
use std::sync::Arc;

/// A stack of tables in ascending update-index order, presented as a single
/// logical view: for each key, the newest table's record wins.
///
/// This is the production read API (see the single-table variants on
/// [`TableReader`] for reading one table in isolation).
pub struct MergedTable {
    tables: Vec<Arc<TableReader>>,
    suppress_deletions: bool,
}

impl MergedTable {
    /// Validates the stack: non-empty, every table sharing `hash_id`, and
    /// strictly increasing, non-overlapping update-index ranges.
    pub fn new(tables: Vec<Arc<TableReader>>, hash_id: HashId, suppress_deletions: bool) -> Result<Self> {
        if tables.is_empty() {
            return Err(Error::ApiMisuse("a merged table needs at least one table".into()));
        }

        for table in &tables {
            if table.hash_size() != hash_id.byte_size() {
                return Err(Error::Format(
                    "stacked table uses a different hash identifier than the merge".into(),
                ));
            }
        }

        for pair in tables.windows(2) {
            if pair[0].max_update_index() >= pair[1].min_update_index() {
                return Err(Error::Format(
                    "stacked tables' update-index ranges must be strictly increasing and non-overlapping"
                        .into(),
                ));
            }
        }

        Ok(Self {
            tables,
            suppress_deletions,
        })
    }

    /// Builds one sub-iterator per table by calling `seek` on each; if any
    /// fails, the iterators already built are simply dropped (closing them)
    /// before the error propagates.
    fn merge_over<F>(&self, seek: F) -> Result<MergedIter>
    where
        F: Fn(&Arc<TableReader>) -> Result<crate::table::TableIter>,
    {
        let mut iterators: Vec<Box<dyn SubIter>> = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            iterators.push(Box::new(seek(table)?));
        }
        Ok(MergedIter::new(iterators, self.suppress_deletions))
    }

    pub fn seek_ref(&self, name: &[u8]) -> Result<MergedTableIter> {
        Ok(MergedTableIter(self.merge_over(|t| t.seek_ref(name))?))
    }

    pub fn seek_log(&self, name: &[u8]) -> Result<MergedTableIter> {
        Ok(MergedTableIter(self.merge_over(|t| t.seek_log(name))?))
    }

    pub fn seek_log_at(&self, name: &[u8], update_index: u64) -> Result<MergedTableIter> {
        Ok(MergedTableIter(self.merge_over(|t| t.seek_log_at(name, update_index))?))
    }

    pub fn close(&self) {
        for table in &self.tables {
            table.close();
        }
    }
}

/// The merged iterator handed out by [`MergedTable`]'s seek operations.
pub struct MergedTableIter(MergedIter);

impl MergedTableIter {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>> {
        self.0.next()
    }

    pub fn close(self) {
        self.0.close();
    }
}
