// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::header::{read_u24, BlockHeader, BLOCK_HEADER_LEN};
use crate::{
    binary_search::partition_point,
    record::{IndexRecord, LogRecord, ObjRecord, Record, RecordKind, RefRecord},
    Error, Result, Slice,
};
use std::io::Cursor;
use varint_rs::VarintReader;

const RESTART_COUNT_LEN: usize = 2;
const RESTART_ENTRY_LEN: usize = 3;

/// A single decoded block: its type, its logical (already-decompressed)
/// content, and the restart array's keys so that seeks don't need to
/// re-decode entries to binary-search.
///
/// `content` is a cheaply-clonable [`Slice`], so [`BlockIter`] keeps its own
/// copy instead of borrowing from this struct: a table iterator can then own
/// both the current `Block` and its `BlockIter` without a self-reference.
#[derive(Clone)]
pub(crate) struct Block {
    kind: RecordKind,

    /// Logical block bytes, header included, decompressed for log blocks.
    /// Restart offsets and the entry cursor are both relative to byte 0 of
    /// this buffer.
    content: Slice,

    /// On-disk footprint: the compressed length for log blocks, else the
    /// declared payload length. The table reader combines this with the
    /// configured block size to compute `full_block_size`.
    on_disk_len: u32,

    restarts: Vec<u32>,
    restart_keys: Vec<Slice>,
    entries_end: usize,
}

impl Block {
    /// Parses a block out of `raw`, which must start at the block's type
    /// tag (i.e. `raw[header_offset..]` is the block, `header_offset` skips
    /// a leading file header on the table's first block).
    pub fn parse(raw: &[u8], header_offset: usize, hash_size: usize) -> Result<Self> {
        let raw = &raw[header_offset..];
        let header = BlockHeader::parse(raw)?;
        let kind = RecordKind::from_tag(header.tag)?;

        let on_disk_len = header.block_len;
        if (on_disk_len as usize) > raw.len() {
            return Err(Error::Format("block length exceeds available bytes".into()));
        }

        let content: Slice = if kind == RecordKind::Log {
            let compressed = &raw[BLOCK_HEADER_LEN..on_disk_len as usize];
            let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(compressed)
                .map_err(|e| Error::Zlib(format!("{e:?}")))?;

            let mut buf = Vec::with_capacity(BLOCK_HEADER_LEN + inflated.len());
            buf.extend_from_slice(&raw[..BLOCK_HEADER_LEN]);
            buf.extend_from_slice(&inflated);
            Slice::from(buf)
        } else {
            Slice::from(&raw[..on_disk_len as usize])
        };

        if content.len() < BLOCK_HEADER_LEN + RESTART_COUNT_LEN {
            return Err(Error::Format("block shorter than its fixed framing".into()));
        }

        let restart_count =
            read_u24(&[0, content[content.len() - 2], content[content.len() - 1]]) as usize;
        let restarts_start = content
            .len()
            .checked_sub(RESTART_COUNT_LEN + restart_count * RESTART_ENTRY_LEN)
            .ok_or_else(|| Error::Format("restart array longer than block".into()))?;

        if restarts_start < BLOCK_HEADER_LEN {
            return Err(Error::Format("restart array overlaps block header".into()));
        }

        let mut restarts = Vec::with_capacity(restart_count);
        for i in 0..restart_count {
            let off = restarts_start + i * RESTART_ENTRY_LEN;
            restarts.push(read_u24(&content[off..off + RESTART_ENTRY_LEN]));
        }

        let mut restart_keys = Vec::with_capacity(restart_count);
        for &off in &restarts {
            restart_keys.push(decode_entry_key(&content, off as usize, &[])?);
        }

        Ok(Self {
            kind,
            content,
            on_disk_len,
            restarts,
            restart_keys,
            entries_end: restarts_start,
        })
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn on_disk_len(&self) -> u32 {
        self.on_disk_len
    }

    /// Shortcut used by block-chain walking: the key of the block's first
    /// entry, without building a full iterator.
    pub fn first_key(&self) -> Result<Slice> {
        decode_entry_key(&self.content, BLOCK_HEADER_LEN, &[])
    }

    pub fn iter(&self, hash_size: usize) -> BlockIter {
        BlockIter {
            kind: self.kind,
            content: self.content.clone(),
            entries_end: self.entries_end,
            hash_size,
            pos: BLOCK_HEADER_LEN,
            last_key: Vec::new(),
        }
    }

    /// Binary-searches the restart array for the greatest restart whose key
    /// is `<= want`, returning an iterator positioned there (restart 0 if
    /// none qualify, per the stated edge case).
    pub fn seek(&self, hash_size: usize, want: &[u8]) -> Result<BlockIter> {
        let qualifying = partition_point(&self.restart_keys, |k| &k[..] <= want);
        let restart_idx = qualifying.saturating_sub(1);
        let start = self.restarts.get(restart_idx).copied().unwrap_or(BLOCK_HEADER_LEN as u32);

        let mut iter = BlockIter {
            kind: self.kind,
            content: self.content.clone(),
            entries_end: self.entries_end,
            hash_size,
            pos: start as usize,
            last_key: Vec::new(),
        };

        loop {
            let save_pos = iter.pos;
            let save_last_key = iter.last_key.clone();

            match iter.next()? {
                None => {
                    iter.pos = save_pos;
                    iter.last_key = save_last_key;
                    break;
                }
                Some(record) => {
                    if record.key().as_ref() >= want {
                        iter.pos = save_pos;
                        iter.last_key = save_last_key;
                        break;
                    }
                }
            }
        }

        Ok(iter)
    }
}

/// Decodes just the key of the entry at `pos`, given the previous entry's
/// key (empty for the first entry of a block or any restart).
fn decode_entry_key(content: &[u8], pos: usize, last_key: &[u8]) -> Result<Slice> {
    let (shared_len, suffix_len, _extra, suffix_start) = decode_entry_prefix(content, pos)?;

    if shared_len > last_key.len() {
        return Err(Error::Format("shared prefix longer than previous key".into()));
    }

    let suffix_end = suffix_start
        .checked_add(suffix_len)
        .filter(|&end| end <= content.len())
        .ok_or_else(|| Error::Format("key suffix runs past block end".into()))?;

    let mut key = Vec::with_capacity(shared_len + suffix_len);
    key.extend_from_slice(&last_key[..shared_len]);
    key.extend_from_slice(&content[suffix_start..suffix_end]);

    Ok(Slice::from(key))
}

/// Reads the two leading varints of an entry; returns `(shared_len,
/// suffix_len, extra, offset of the key suffix bytes)`.
fn decode_entry_prefix(content: &[u8], pos: usize) -> Result<(usize, usize, u8, usize)> {
    let mut cursor = Cursor::new(&content[pos..]);
    let shared_len = cursor
        .read_u64_varint()
        .map_err(|_| Error::Format("truncated shared-prefix-length varint".into()))? as usize;
    let suffix_with_extra = cursor
        .read_u64_varint()
        .map_err(|_| Error::Format("truncated suffix-length varint".into()))?;

    let suffix_len = (suffix_with_extra >> 3) as usize;
    let extra = (suffix_with_extra & 0x7) as u8;

    let consumed = cursor.position() as usize;
    Ok((shared_len, suffix_len, extra, pos + consumed))
}

/// Walks one block's entries in key order. Owns its own copy of the block's
/// content (an `Arc` clone, so this is cheap).
pub(crate) struct BlockIter {
    kind: RecordKind,
    content: Slice,
    entries_end: usize,
    hash_size: usize,
    pos: usize,
    last_key: Vec<u8>,
}

impl BlockIter {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>> {
        if self.pos >= self.entries_end {
            return Ok(None);
        }

        let (shared_len, suffix_len, extra, suffix_start) =
            decode_entry_prefix(&self.content, self.pos)?;

        if shared_len > self.last_key.len() {
            return Err(Error::Format("shared prefix longer than previous key".into()));
        }

        let suffix_end = suffix_start
            .checked_add(suffix_len)
            .filter(|&end| end <= self.entries_end)
            .ok_or_else(|| Error::Format("key suffix runs past block end".into()))?;

        let mut key = Vec::with_capacity(shared_len + suffix_len);
        key.extend_from_slice(&self.last_key[..shared_len]);
        key.extend_from_slice(&self.content[suffix_start..suffix_end]);

        let mut cursor = Cursor::new(&self.content[suffix_end..self.entries_end]);
        let record = self.decode_record(extra, key.clone(), &mut cursor)?;
        let value_len = cursor.position() as usize;

        self.last_key = key;
        self.pos = suffix_end + value_len;

        Ok(Some(record))
    }

    fn decode_record(
        &self,
        extra: u8,
        key: Vec<u8>,
        cursor: &mut Cursor<&[u8]>,
    ) -> Result<Record> {
        let key = Slice::from(key);

        let record = match self.kind {
            RecordKind::Ref => {
                let (update_index, value) = RefRecord::decode_value(extra, cursor, self.hash_size)?;
                Record::Ref(RefRecord {
                    name: key,
                    update_index,
                    value,
                })
            }
            RecordKind::Log => {
                let (name, update_index) = LogRecord::split_key(&key)?;
                let value = LogRecord::decode_value(extra, cursor, self.hash_size)?;
                Record::Log(LogRecord {
                    name,
                    update_index,
                    value,
                })
            }
            RecordKind::Obj => {
                let offsets = ObjRecord::decode_value(cursor)?;
                Record::Obj(ObjRecord { prefix: key, offsets })
            }
            RecordKind::Index => {
                let offset = IndexRecord::decode_value(cursor)?;
                Record::Index(IndexRecord {
                    last_key: key,
                    offset,
                })
            }
        };

        Ok(record)
    }
}
