// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{coding::read_exact_vec, DecodeError, Slice};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// What a ref record says the name points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefValue {
    /// The ref was removed as of this record's update index.
    Deletion,

    /// Points straight at an object id.
    Direct(Slice),

    /// Points at another ref by name.
    Symref(Slice),

    /// Points straight at an object id, and also records the peeled object
    /// id of the tag it refers to.
    DirectWithPeel(Slice, Slice),
}

/// A single ref's state as of one table.
#[derive(Clone, Debug, PartialEq)]
pub struct RefRecord {
    pub name: Slice,

    /// Already rebased against the owning table's `min_update_index`; see
    /// the reader's rebasing step.
    pub update_index: u64,

    pub value: RefValue,
}

impl RefRecord {
    const TYPE_DELETION: u8 = 0;
    const TYPE_DIRECT: u8 = 1;
    const TYPE_SYMREF: u8 = 2;
    const TYPE_DIRECT_WITH_PEEL: u8 = 3;

    /// Decodes a ref value given the 3 extra bits stored alongside the key
    /// suffix length. `update_index` here is still table-relative; callers
    /// rebase with `min_update_index`.
    pub(crate) fn decode_value<R: Read>(
        extra: u8,
        reader: &mut R,
        hash_size: usize,
    ) -> Result<(u64, RefValue), DecodeError> {
        let update_index_delta = reader.read_u64_varint()?;

        let value = match extra {
            Self::TYPE_DELETION => RefValue::Deletion,
            Self::TYPE_DIRECT => {
                let hash = read_exact_vec(reader, hash_size)?;
                RefValue::Direct(Slice::from(hash))
            }
            Self::TYPE_SYMREF => {
                let len = reader.read_u64_varint()? as usize;
                let target = read_exact_vec(reader, len)?;
                RefValue::Symref(Slice::from(target))
            }
            Self::TYPE_DIRECT_WITH_PEEL => {
                let hash = read_exact_vec(reader, hash_size)?;
                let peeled = read_exact_vec(reader, hash_size)?;
                RefValue::DirectWithPeel(Slice::from(hash), Slice::from(peeled))
            }
            other => {
                return Err(DecodeError::Malformed(format!(
                    "unknown ref value type {other}"
                )))
            }
        };

        Ok((update_index_delta, value))
    }

    /// Inverse of [`Self::decode_value`]; used by test fixtures to build raw
    /// block bytes. Returns the 3-bit extra tag alongside the encoded value
    /// bytes.
    #[cfg(test)]
    pub(crate) fn encode_value(update_index_delta: u64, value: &RefValue) -> (u8, Vec<u8>) {
        let mut buf = Vec::new();
        buf.write_u64_varint(update_index_delta).expect("vec write");

        let extra = match value {
            RefValue::Deletion => Self::TYPE_DELETION,
            RefValue::Direct(hash) => {
                buf.write_all(hash).expect("vec write");
                Self::TYPE_DIRECT
            }
            RefValue::Symref(target) => {
                buf.write_u64_varint(target.len() as u64).expect("vec write");
                buf.write_all(target).expect("vec write");
                Self::TYPE_SYMREF
            }
            RefValue::DirectWithPeel(hash, peeled) => {
                buf.write_all(hash).expect("vec write");
                buf.write_all(peeled).expect("vec write");
                Self::TYPE_DIRECT_WITH_PEEL
            }
        };

        (extra, buf)
    }
}
