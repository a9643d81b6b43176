// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! K-way merge over a stack of tables' sub-iterators: last-writer-wins with
//! optional deletion suppression.

use crate::{table::TableIter, Record, Result};
use interval_heap::IntervalHeap as Heap;
use std::cmp::Ordering;

/// What [`MergedIter`] merges over. [`TableIter`] is the only real
/// implementor; the trait exists so tests can merge over canned sequences
/// without building whole tables.
pub(crate) trait SubIter {
    fn next(&mut self) -> Result<Option<Record>>;
}

impl SubIter for TableIter {
    fn next(&mut self) -> Result<Option<Record>> {
        TableIter::next(self)
    }
}

struct HeapEntry {
    record: Record,
    source_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record.key() == other.record.key() && self.source_index == other.source_index
    }
}

impl Eq for HeapEntry {}

// Ties on key are broken by *higher* source index first: later tables in
// the stack are newer, so they must dominate at step 2 of the merge.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.record.key().as_ref().cmp(other.record.key().as_ref()) {
            Ordering::Equal => other.source_index.cmp(&self.source_index),
            ord => ord,
        }
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges `N` per-table sub-iterators of the same record kind into one
/// logical view: for each key, yields the record from the newest table that
/// has one, optionally hiding deletions.
pub(crate) struct MergedIter {
    iterators: Vec<Box<dyn SubIter>>,
    heap: Heap<HeapEntry>,
    suppress_deletions: bool,
    initialized: bool,
}

impl MergedIter {
    pub fn new(iterators: Vec<Box<dyn SubIter>>, suppress_deletions: bool) -> Self {
        Self {
            heap: Heap::with_capacity(iterators.len()),
            iterators,
            suppress_deletions,
            initialized: false,
        }
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        for (source_index, iter) in self.iterators.iter_mut().enumerate() {
            if let Some(record) = iter.next()? {
                self.heap.push(HeapEntry { record, source_index });
            }
        }

        self.initialized = true;
        Ok(())
    }

    pub fn next(&mut self) -> Result<Option<Record>> {
        self.ensure_initialized()?;

        loop {
            let Some(entry) = self.heap.pop_min() else {
                return Ok(None);
            };

            self.refill(entry.source_index)?;

            while let Some(top) = self.heap.peek_min() {
                if top.record.key() != entry.record.key() {
                    break;
                }
                let shadowed = self.heap.pop_min().expect("just peeked");
                self.refill(shadowed.source_index)?;
            }

            if self.suppress_deletions && entry.record.is_deletion() {
                continue;
            }

            return Ok(Some(entry.record));
        }
    }

    fn refill(&mut self, source_index: usize) -> Result<()> {
        if let Some(record) = self.iterators[source_index].next()? {
            self.heap.push(HeapEntry { record, source_index });
        }
        Ok(())
    }

    pub fn close(self) {}
}
