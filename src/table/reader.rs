// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    footer::Footer,
    iter::TableIter,
    obj::ObjIter,
};
use crate::{
    block::{Block, FileHeader},
    block_source::BlockSource,
    record::RecordKind,
    Error, Result, Slice,
};
use log::{debug, trace};
use std::sync::Arc;

/// Used when the file header doesn't declare a block size (legacy writers).
const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Where one record kind's blocks live within the file.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SubStream {
    pub offset: u64,
    pub index_offset: u64,
    pub present: bool,
}

/// Parses a table's header and footer and answers seeks against its three
/// sub-streams (refs, logs, obj-to-refs).
///
/// Held behind an `Arc` so [`TableIter`]s (and, stacked, a
/// [`crate::MergedTable`]) can share one open table without lifetime
/// plumbing; the block source itself is free to serve concurrent reads (see
/// `FileBlockSource`, which locks only around the actual file cursor).
pub struct TableReader {
    source: Box<dyn BlockSource>,
    header: FileHeader,
    footer: Footer,
    first_block_type: u8,
    size: u64,

    ref_stream: SubStream,
    log_stream: SubStream,
    obj_stream: SubStream,
    obj_id_len: usize,
}

impl TableReader {
    pub fn open(source: Box<dyn BlockSource>) -> Result<Arc<Self>> {
        let size = source.size()?;
        if size < FileHeader::V1_LEN as u64 {
            return Err(Error::Format("file too small to be a reftable".into()));
        }

        let probe_len = (FileHeader::V2_LEN + 1).min(size as usize);
        let probe = source.read(0, probe_len)?;
        let header = FileHeader::parse(&probe)?;

        if probe.len() <= header.len() {
            return Err(Error::Format("file too small to hold a first block".into()));
        }
        let first_block_type = probe[header.len()];

        let footer_len = Footer::len_for_version(header.version);
        if size < footer_len {
            return Err(Error::Format("file too small to hold a footer".into()));
        }
        let footer_bytes = source.read(size - footer_len, footer_len as usize)?;
        let header_bytes = &probe[..header.len()];
        let footer = Footer::parse(&footer_bytes, header_bytes)?;

        let ref_stream = SubStream {
            offset: 0,
            index_offset: footer.ref_index_offset,
            present: first_block_type == RecordKind::Ref.tag(),
        };
        let log_stream = SubStream {
            offset: footer.log_offset,
            index_offset: footer.log_index_offset,
            present: first_block_type == RecordKind::Log.tag() || footer.log_offset > 0,
        };
        let obj_stream = SubStream {
            offset: footer.obj_offset,
            index_offset: footer.obj_index_offset,
            present: footer.obj_offset > 0,
        };

        debug!(
            "opened reftable: version={} size={size} ref.present={} log.present={} obj.present={}",
            header.version, ref_stream.present, log_stream.present, obj_stream.present
        );

        let obj_id_len = footer.obj_id_len;

        Ok(Arc::new(Self {
            source,
            header,
            footer,
            first_block_type,
            size,
            ref_stream,
            log_stream,
            obj_stream,
            obj_id_len,
        }))
    }

    pub fn close(&self) {
        self.source.close();
    }

    #[must_use]
    pub fn hash_size(&self) -> usize {
        self.footer.hash_id.byte_size()
    }

    #[must_use]
    pub fn hash_id(&self) -> crate::HashId {
        self.footer.hash_id
    }

    #[must_use]
    pub fn min_update_index(&self) -> u64 {
        self.footer.min_update_index
    }

    #[must_use]
    pub fn max_update_index(&self) -> u64 {
        self.footer.max_update_index
    }

    pub(crate) fn data_size(&self) -> u64 {
        self.size - Footer::len_for_version(self.header.version)
    }

    pub(crate) fn stream_for(&self, kind: RecordKind) -> SubStream {
        match kind {
            RecordKind::Ref => self.ref_stream,
            RecordKind::Log => self.log_stream,
            RecordKind::Obj => self.obj_stream,
            RecordKind::Index => unreachable!("index blocks have no sub-stream descriptor"),
        }
    }

    /// Fetches exactly `len` bytes at `off`, clamped to the table's data
    /// region (the footer is never returned from here). `None` signals
    /// `off` is already past the end.
    fn read_block_bytes(&self, off: u64, len: usize) -> Result<Option<Slice>> {
        let data_size = self.data_size();
        if off >= data_size {
            return Ok(None);
        }
        let clamped = (len as u64).min(data_size - off) as usize;
        Ok(Some(self.source.read(off, clamped)?))
    }

    /// Speculatively reads a block at `off` assuming it is `block_size` (or
    /// [`DEFAULT_BLOCK_SIZE`]) bytes; re-reads with the declared size if the
    /// guess was too small. Returns `None` (not an error) when there is no
    /// block at `off`, or the block there isn't of `want_kind` — both cases
    /// mean "end of this sub-stream's chain" to callers.
    pub(crate) fn init_block_reader(&self, off: u64, want_kind: RecordKind) -> Result<Option<Block>> {
        let header_offset = if off == 0 { self.header.len() } else { 0 };
        let guess = if self.header.block_size > 0 {
            self.header.block_size
        } else {
            DEFAULT_BLOCK_SIZE
        } as usize;

        let Some(bytes) = self.read_block_bytes(off, header_offset + guess)? else {
            return Ok(None);
        };
        if bytes.len() <= header_offset {
            return Ok(None);
        }

        let tag = bytes[header_offset];
        let Ok(actual_kind) = RecordKind::from_tag(tag) else {
            return Ok(None);
        };
        if actual_kind != want_kind {
            trace!("block at {off} is {actual_kind:?}, not the requested {want_kind:?}");
            return Ok(None);
        }

        let block_len = crate::block::header::read_u24(&bytes[header_offset + 1..header_offset + 4]) as usize;
        let bytes = if header_offset + block_len > bytes.len() {
            let Some(full) = self.read_block_bytes(off, header_offset + block_len)? else {
                return Err(Error::Format("block header promises more bytes than the file has".into()));
            };
            full
        } else {
            bytes
        };

        Ok(Some(Block::parse(&bytes, header_offset, self.hash_size())?))
    }

    /// `block`'s footprint on disk: trusted for log blocks (self-describing
    /// compressed length) but, for data/index blocks, only a guess based on
    /// the declared block size. Block-chain advancement always re-verifies
    /// the type tag at the resulting offset (see the open question this
    /// documents) and falls back to `block.on_disk_len()` if the guess was
    /// wrong, so an unpadded writer is still read correctly.
    fn full_block_size(&self, block: &Block) -> u64 {
        if block.kind() == RecordKind::Log || self.header.block_size == 0 {
            u64::from(block.on_disk_len())
        } else {
            u64::from(self.header.block_size)
        }
    }

    /// Advances from `(offset, block)` to the next block in `kind`'s chain.
    /// Returns `None` at the end of the chain.
    pub(crate) fn next_block_in_chain(
        &self,
        offset: u64,
        block: &Block,
        kind: RecordKind,
    ) -> Result<Option<(u64, Block)>> {
        let guess = offset + self.full_block_size(block);
        if let Some(next) = self.init_block_reader(guess, kind)? {
            return Ok(Some((guess, next)));
        }

        let fallback = offset + u64::from(block.on_disk_len());
        if fallback != guess {
            if let Some(next) = self.init_block_reader(fallback, kind)? {
                return Ok(Some((fallback, next)));
            }
        }

        Ok(None)
    }

    fn empty_iter(self: &Arc<Self>, kind: RecordKind) -> TableIter {
        TableIter::empty(Arc::clone(self), kind)
    }

    /// Walks block-by-block while the next block's first key is `<= want`,
    /// then seeks inside the block that must contain `want`.
    fn seek_linear(self: &Arc<Self>, kind: RecordKind, start_offset: u64, want: &[u8]) -> Result<TableIter> {
        let Some(mut block) = self.init_block_reader(start_offset, kind)? else {
            return Ok(self.empty_iter(kind));
        };
        let mut offset = start_offset;

        loop {
            let Some((next_offset, next_block)) = self.next_block_in_chain(offset, &block, kind)? else {
                break;
            };

            if next_block.first_key()?.as_ref() <= want {
                offset = next_offset;
                block = next_block;
            } else {
                break;
            }
        }

        let block_iter = block.seek(self.hash_size(), want)?;
        Ok(TableIter::at(Arc::clone(self), kind, offset, block, block_iter))
    }

    /// Descends the sparse index for `kind`, starting at `index_offset`,
    /// to find the data block that might hold `want`.
    fn seek_indexed(self: &Arc<Self>, kind: RecordKind, index_offset: u64, want: &[u8]) -> Result<TableIter> {
        let mut offset = index_offset;

        loop {
            let mut index_iter = self.seek_linear(RecordKind::Index, offset, want)?;
            let Some(entry) = index_iter.next()? else {
                return Ok(self.empty_iter(kind));
            };
            let entry = entry.into_index()?;

            if let Some(block) = self.init_block_reader(entry.offset, kind)? {
                let block_iter = block.seek(self.hash_size(), want)?;
                return Ok(TableIter::at(Arc::clone(self), kind, entry.offset, block, block_iter));
            }

            if self.init_block_reader(entry.offset, RecordKind::Index)?.is_some() {
                offset = entry.offset;
                continue;
            }

            return Err(Error::Format(
                "index entry points at neither a data block nor a nested index block".into(),
            ));
        }
    }

    fn seek_sub_stream(self: &Arc<Self>, kind: RecordKind, want: &[u8]) -> Result<TableIter> {
        let stream = self.stream_for(kind);
        if !stream.present {
            return Ok(self.empty_iter(kind));
        }

        if stream.index_offset > 0 {
            self.seek_indexed(kind, stream.index_offset, want)
        } else {
            self.seek_linear(kind, stream.offset, want)
        }
    }

    pub fn seek_ref(self: &Arc<Self>, name: &[u8]) -> Result<TableIter> {
        self.seek_sub_stream(RecordKind::Ref, name)
    }

    /// Seeks to the newest (greatest update index) reflog entry for `name`.
    pub fn seek_log(self: &Arc<Self>, name: &[u8]) -> Result<TableIter> {
        let want = log_seek_key(name, 0);
        self.seek_sub_stream(RecordKind::Log, &want)
    }

    /// Seeks to the reflog entry for `name` with the greatest update index
    /// `<= update_index`.
    pub fn seek_log_at(self: &Arc<Self>, name: &[u8], update_index: u64) -> Result<TableIter> {
        let want = log_seek_key(name, !update_index);
        self.seek_sub_stream(RecordKind::Log, &want)
    }

    /// Yields the ref records whose value hashes equal `object_id`.
    pub fn refs_for_object_id(self: &Arc<Self>, object_id: &[u8]) -> Result<ObjIter> {
        self.refs_for_object_id_with(object_id, crate::Options::default())
    }

    /// Same as [`Self::refs_for_object_id`], with [`crate::Options`] to
    /// control whether the indexed path re-verifies each candidate.
    pub fn refs_for_object_id_with(
        self: &Arc<Self>,
        object_id: &[u8],
        options: crate::Options,
    ) -> Result<ObjIter> {
        ObjIter::build(self, object_id, options)
    }

    pub(crate) fn obj_id_len(&self) -> usize {
        self.obj_id_len
    }

    pub(crate) fn obj_stream(&self) -> SubStream {
        self.obj_stream
    }

    pub(crate) fn seek_obj_prefix(self: &Arc<Self>, prefix: &[u8]) -> Result<TableIter> {
        self.seek_sub_stream(RecordKind::Obj, prefix)
    }

    /// Full, unseeked scan of the ref sub-stream, used by the unindexed
    /// object-id lookup path.
    pub(crate) fn scan_refs(self: &Arc<Self>) -> Result<TableIter> {
        self.seek_sub_stream(RecordKind::Ref, &[])
    }
}

/// Builds the key used to seek the log sub-stream: `name` followed by the
/// 8-byte big-endian suffix.
fn log_seek_key(name: &[u8], suffix: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 8);
    key.extend_from_slice(name);
    key.extend_from_slice(&suffix.to_be_bytes());
    key
}
