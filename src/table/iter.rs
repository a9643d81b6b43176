// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::reader::TableReader;
use crate::{block::Block, block::BlockIter, record::RecordKind, Record, Result};
use std::sync::Arc;

/// Cross-block iteration over one of a table's sub-streams.
///
/// Holds the current block and its block-level iterator; on exhausting a
/// block, advances to the next one in the chain (see
/// [`TableReader::next_block_in_chain`]) until the chain ends or a
/// type-boundary is crossed.
pub struct TableIter {
    reader: Arc<TableReader>,
    kind: RecordKind,
    current_offset: u64,
    block: Option<Block>,
    block_iter: Option<BlockIter>,
    finished: bool,
}

impl TableIter {
    pub(crate) fn empty(reader: Arc<TableReader>, kind: RecordKind) -> Self {
        Self {
            reader,
            kind,
            current_offset: 0,
            block: None,
            block_iter: None,
            finished: true,
        }
    }

    pub(crate) fn at(
        reader: Arc<TableReader>,
        kind: RecordKind,
        offset: u64,
        block: Block,
        block_iter: BlockIter,
    ) -> Self {
        Self {
            reader,
            kind,
            current_offset: offset,
            block: Some(block),
            block_iter: Some(block_iter),
            finished: false,
        }
    }

    /// Yields the next record, rebasing ref update indices against the
    /// table's `min_update_index` as it does (log and obj records are not
    /// rebased: log keys already carry an absolute update index, and obj
    /// records carry none).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let Some(block_iter) = self.block_iter.as_mut() else {
                self.finished = true;
                return Ok(None);
            };

            match block_iter.next()? {
                Some(mut record) => {
                    if self.kind == RecordKind::Ref {
                        if let Record::Ref(r) = &mut record {
                            r.update_index += self.reader.min_update_index();
                        }
                    }
                    return Ok(Some(record));
                }
                None => {
                    let block = self.block.as_ref().expect("block_iter implies block");
                    match self.reader.next_block_in_chain(self.current_offset, block, self.kind)? {
                        Some((offset, next_block)) => {
                            let next_iter = next_block.iter(self.reader.hash_size());
                            self.current_offset = offset;
                            self.block_iter = Some(next_iter);
                            self.block = Some(next_block);
                        }
                        None => {
                            self.finished = true;
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }

    pub fn close(self) {}
}
