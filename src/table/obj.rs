// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{iter::TableIter, reader::TableReader};
use crate::{
    block::BlockIter,
    record::{RecordKind, RefValue},
    Error, Options, Record, Result, Slice,
};
use std::sync::Arc;

/// The ref records pointing at a queried object id.
///
/// Takes the indexed path (seek the obj sub-stream by truncated prefix, then
/// read every listed ref block in full) when the table has an obj index;
/// otherwise falls back to scanning every ref record and filtering by hash.
pub struct ObjIter(Inner);

enum Inner {
    Indexed {
        reader: Arc<TableReader>,
        offsets: Vec<u64>,
        next_offset_idx: usize,
        block_iter: Option<BlockIter>,
        /// Re-check each candidate's hash against the query instead of
        /// trusting the index's prefix match unconditionally.
        target: Option<Slice>,
    },
    Unindexed {
        table_iter: TableIter,
        target: Slice,
    },
    Empty,
}

impl ObjIter {
    pub(crate) fn build(reader: &Arc<TableReader>, object_id: &[u8], options: Options) -> Result<Self> {
        if reader.obj_stream().present {
            let len = reader.obj_id_len().min(object_id.len());
            let prefix = &object_id[..len];

            let mut it = reader.seek_obj_prefix(prefix)?;
            if let Some(record) = it.next()? {
                let obj = record.into_obj()?;
                if obj.prefix.as_ref() == prefix {
                    return Ok(Self(Inner::Indexed {
                        reader: Arc::clone(reader),
                        offsets: obj.offsets,
                        next_offset_idx: 0,
                        block_iter: None,
                        target: options.reverify_object_lookup.then(|| Slice::from(object_id)),
                    }));
                }
            }
            Ok(Self(Inner::Empty))
        } else {
            Ok(Self(Inner::Unindexed {
                table_iter: reader.scan_refs()?,
                target: Slice::from(object_id),
            }))
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>> {
        match &mut self.0 {
            Inner::Indexed {
                reader,
                offsets,
                next_offset_idx,
                block_iter,
                target,
            } => loop {
                if let Some(bi) = block_iter {
                    while let Some(record) = bi.next()? {
                        if let Some(target) = target {
                            let Record::Ref(r) = &record else {
                                unreachable!("the ref sub-stream only yields ref records")
                            };
                            if !ref_matches(r, target) {
                                continue;
                            }
                        }
                        return Ok(Some(record));
                    }
                    *block_iter = None;
                }

                let Some(&offset) = offsets.get(*next_offset_idx) else {
                    return Ok(None);
                };
                *next_offset_idx += 1;

                match reader.init_block_reader(offset, RecordKind::Ref)? {
                    Some(block) => *block_iter = Some(block.iter(reader.hash_size())),
                    None => {
                        return Err(Error::Format(
                            "obj record offset does not point at a ref block".into(),
                        ))
                    }
                }
            },
            Inner::Unindexed { table_iter, target } => loop {
                match table_iter.next()? {
                    Some(Record::Ref(r)) => {
                        if ref_matches(&r, target) {
                            return Ok(Some(Record::Ref(r)));
                        }
                    }
                    Some(_) => unreachable!("the ref sub-stream only yields ref records"),
                    None => return Ok(None),
                }
            },
            Inner::Empty => Ok(None),
        }
    }

    pub fn close(self) {}
}

fn ref_matches(record: &crate::record::RefRecord, target: &Slice) -> bool {
    match &record.value {
        RefValue::Direct(hash) | RefValue::DirectWithPeel(hash, _) => hash == target,
        RefValue::Deletion | RefValue::Symref(_) => false,
    }
}
