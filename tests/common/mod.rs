// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Minimal reftable byte-stream builder for integration tests.
//!
//! There is no writer in this crate (out of scope), so tests that need a
//! real table on disk build one by hand: a ref block, a single
//! (zlib-compressed) log block, and a footer, by default; [`TableBuilder`]
//! also has builders for a multi-block indexed ref sub-stream and an obj
//! block, for tests that need to exercise the indexed seek paths. Good
//! enough to exercise the reader against realistic bytes without
//! reimplementing a compactor.

#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};
use miniz_oxide::deflate::compress_to_vec_zlib;
use reftable::{LogValue, RefValue};
use varint_rs::VarintWriter;

const BLOCK_HEADER_LEN: usize = 4;
const SHA1_TAG: u32 = 0x7368_6131;
const SHA256_TAG: u32 = 0x7332_3536;

fn write_u24(buf: &mut Vec<u8>, value: u32) {
    buf.push((value >> 16) as u8);
    buf.push((value >> 8) as u8);
    buf.push(value as u8);
}

fn encode_ref_value(delta: u64, value: &RefValue) -> (u8, Vec<u8>) {
    let mut buf = Vec::new();
    buf.write_u64_varint(delta).unwrap();

    let extra = match value {
        RefValue::Deletion => 0,
        RefValue::Direct(hash) => {
            buf.extend_from_slice(hash);
            1
        }
        RefValue::Symref(target) => {
            buf.write_u64_varint(target.len() as u64).unwrap();
            buf.extend_from_slice(target);
            2
        }
        RefValue::DirectWithPeel(hash, peeled) => {
            buf.extend_from_slice(hash);
            buf.extend_from_slice(peeled);
            3
        }
    };

    (extra, buf)
}

fn encode_index_value(offset: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u64_varint(offset).unwrap();
    buf
}

fn encode_obj_value(offsets: &[u64]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u64_varint(offsets.len() as u64).unwrap();

    let mut previous = 0u64;
    for (i, &offset) in offsets.iter().enumerate() {
        let value = if i == 0 { offset } else { offset - previous };
        buf.write_u64_varint(value).unwrap();
        previous = offset;
    }

    buf
}

fn encode_log_value(value: &LogValue) -> (u8, Vec<u8>) {
    let mut buf = Vec::new();

    let extra = match value {
        LogValue::Deletion => 0,
        LogValue::Update {
            old_hash,
            new_hash,
            name,
            email,
            time,
            tz_offset,
            message,
        } => {
            buf.extend_from_slice(old_hash);
            buf.extend_from_slice(new_hash);
            buf.write_u64_varint(name.len() as u64).unwrap();
            buf.extend_from_slice(name);
            buf.write_u64_varint(email.len() as u64).unwrap();
            buf.extend_from_slice(email);
            buf.write_u64_varint(*time).unwrap();
            buf.extend_from_slice(&tz_offset.to_be_bytes());
            buf.write_u64_varint(message.len() as u64).unwrap();
            buf.extend_from_slice(message);
            1
        }
    };

    (extra, buf)
}

/// Builds one block (no prefix compression, one restart per entry) holding
/// `entries` of `(key, extra, value_bytes)`, already sorted by key.
fn build_block(tag: u8, entries: &[(Vec<u8>, u8, Vec<u8>)], compress: bool) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut restarts = Vec::new();

    for (key, extra, value_bytes) in entries {
        restarts.push(BLOCK_HEADER_LEN as u32 + payload.len() as u32);
        payload.write_u64_varint(0).unwrap(); // no shared prefix
        payload
            .write_u64_varint(((key.len() as u64) << 3) | u64::from(*extra))
            .unwrap();
        payload.extend_from_slice(key);
        payload.extend_from_slice(value_bytes);
    }

    let mut body = payload;
    for &r in &restarts {
        let bytes = r.to_be_bytes();
        body.extend_from_slice(&bytes[1..]);
    }
    body.extend_from_slice(&(restarts.len() as u16).to_be_bytes());

    let stored = if compress { compress_to_vec_zlib(&body, 6) } else { body };

    let mut block = vec![tag, 0, 0, 0];
    block.extend_from_slice(&stored);

    let len = block.len() as u32;
    let len_bytes = len.to_be_bytes();
    block[1] = len_bytes[1];
    block[2] = len_bytes[2];
    block[3] = len_bytes[3];

    block
}

/// A ref record to embed in a built table: `(name, absolute update index,
/// value)`. The on-disk delta against `min_update_index` is computed by
/// [`TableBuilder::build`].
pub type RefEntry<'a> = (&'a str, u64, RefValue);

/// A log record to embed in a built table: `(name, update index, value)`.
pub type LogEntry<'a> = (&'a str, u64, LogValue);

/// Builds a complete, well-formed reftable byte stream: an optional ref
/// block, an optional (compressed) log block, and a footer.
///
/// `refs` must already be sorted by name; `logs` may be given in any order
/// (the builder sorts by on-disk key, i.e. newest update index first).
pub struct TableBuilder {
    pub version: u8,
    pub min_update_index: u64,
    pub max_update_index: u64,
    pub hash_sha256: bool,
}

impl TableBuilder {
    #[must_use]
    pub fn new(min_update_index: u64, max_update_index: u64) -> Self {
        Self {
            version: 1,
            min_update_index,
            max_update_index,
            hash_sha256: false,
        }
    }

    #[must_use]
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn sha256(mut self) -> Self {
        self.hash_sha256 = true;
        self.version = 2;
        self
    }

    fn file_header(&self) -> Vec<u8> {
        let mut header = b"REFT".to_vec();
        header.push(self.version);
        write_u24(&mut header, 0); // unbounded block size: trust on_disk_len
        if self.version == 2 {
            let tag = if self.hash_sha256 { SHA256_TAG } else { SHA1_TAG };
            header.extend_from_slice(&tag.to_be_bytes());
        }
        header
    }

    /// Appends a footer to `out`, given the already-written common prefix
    /// (`magic | version | block_size`) and the sub-stream descriptors.
    ///
    /// The footer repeats only that 8-byte prefix, not the file header's
    /// hash id: in the footer, hash id (v2 only) comes after
    /// `min_update`/`max_update` instead.
    fn write_footer(
        &self,
        out: &mut Vec<u8>,
        header_prefix: &[u8],
        ref_index_offset: u64,
        obj_offset_packed: u64,
        obj_index_offset: u64,
        log_offset: u64,
        log_index_offset: u64,
    ) {
        let mut footer = header_prefix[..8].to_vec();
        footer.write_u64::<BigEndian>(self.min_update_index).unwrap();
        footer.write_u64::<BigEndian>(self.max_update_index).unwrap();
        if self.version == 2 {
            let tag = if self.hash_sha256 { SHA256_TAG } else { SHA1_TAG };
            footer.extend_from_slice(&tag.to_be_bytes());
        }
        footer.write_u64::<BigEndian>(ref_index_offset).unwrap();
        footer.write_u64::<BigEndian>(obj_offset_packed).unwrap();
        footer.write_u64::<BigEndian>(obj_index_offset).unwrap();
        footer.write_u64::<BigEndian>(log_offset).unwrap();
        footer.write_u64::<BigEndian>(log_index_offset).unwrap();

        let crc = crc32fast::hash(&footer);
        footer.write_u32::<BigEndian>(crc).unwrap();

        out.extend_from_slice(&footer);
    }

    #[must_use]
    pub fn build(&self, refs: &[RefEntry], logs: &[LogEntry]) -> Vec<u8> {
        let header = self.file_header();
        let mut out = header.clone();
        let mut log_offset = 0u64;

        if !refs.is_empty() {
            let entries: Vec<_> = refs
                .iter()
                .map(|(name, update_index, value)| {
                    let delta = update_index - self.min_update_index;
                    let (extra, value_bytes) = encode_ref_value(delta, value);
                    (name.as_bytes().to_vec(), extra, value_bytes)
                })
                .collect();
            out.extend_from_slice(&build_block(b'r', &entries, false));
        }

        if !logs.is_empty() {
            log_offset = out.len() as u64;

            let mut entries: Vec<_> = logs
                .iter()
                .map(|(name, update_index, value)| {
                    let mut key = name.as_bytes().to_vec();
                    key.extend_from_slice(&(!update_index).to_be_bytes());
                    let (extra, value_bytes) = encode_log_value(value);
                    (key, extra, value_bytes)
                })
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            out.extend_from_slice(&build_block(b'l', &entries, true));
        }

        self.write_footer(&mut out, &header, 0, 0, 0, log_offset, 0);
        out
    }

    /// Splits a ref sub-stream across one data block per entry of `blocks`
    /// (each already sorted, blocks given in ascending key order) and adds a
    /// ref index block over their last keys, so `footer.ref_index_offset`
    /// is nonzero and seeks descend through `TableReader::seek_indexed`
    /// instead of the single-block linear scan `build` produces.
    #[must_use]
    pub fn build_indexed_refs(&self, blocks: &[&[RefEntry]]) -> Vec<u8> {
        let header = self.file_header();
        let mut out = header.clone();
        let mut index_entries = Vec::new();

        for block in blocks {
            let offset = out.len() as u64;
            let entries: Vec<_> = block
                .iter()
                .map(|(name, update_index, value)| {
                    let delta = update_index - self.min_update_index;
                    let (extra, value_bytes) = encode_ref_value(delta, value);
                    (name.as_bytes().to_vec(), extra, value_bytes)
                })
                .collect();
            out.extend_from_slice(&build_block(b'r', &entries, false));

            let last_name = block.last().expect("each ref block must be non-empty").0;
            index_entries.push((last_name.as_bytes().to_vec(), 0u8, encode_index_value(offset)));
        }

        let ref_index_offset = out.len() as u64;
        out.extend_from_slice(&build_block(b'i', &index_entries, false));

        self.write_footer(&mut out, &header, ref_index_offset, 0, 0, 0, 0);
        out
    }

    /// Builds one ref block plus one obj block mapping object-id prefixes
    /// (of `obj_id_len` bytes) to the ref block offsets holding refs that
    /// point at them, so `footer.obj_offset_packed` is nonzero and
    /// `refs_for_object_id` takes `ObjIter`'s indexed path instead of
    /// falling back to a full unindexed ref scan.
    #[must_use]
    pub fn build_with_obj_index(
        &self,
        refs: &[RefEntry],
        obj_id_len: usize,
        obj_entries: &[(Vec<u8>, Vec<u64>)],
    ) -> Vec<u8> {
        let header = self.file_header();
        let mut out = header.clone();

        let ref_entries: Vec<_> = refs
            .iter()
            .map(|(name, update_index, value)| {
                let delta = update_index - self.min_update_index;
                let (extra, value_bytes) = encode_ref_value(delta, value);
                (name.as_bytes().to_vec(), extra, value_bytes)
            })
            .collect();
        out.extend_from_slice(&build_block(b'r', &ref_entries, false));

        let obj_offset = out.len() as u64;
        let obj_block_entries: Vec<_> = obj_entries
            .iter()
            .map(|(prefix, offsets)| (prefix.clone(), 0u8, encode_obj_value(offsets)))
            .collect();
        out.extend_from_slice(&build_block(b'o', &obj_block_entries, false));

        let obj_offset_packed = (obj_offset << 5) | obj_id_len as u64;
        self.write_footer(&mut out, &header, 0, obj_offset_packed, 0, 0, 0);
        out
    }
}

pub fn hash(byte: u8) -> Vec<u8> {
    vec![byte; 20]
}
