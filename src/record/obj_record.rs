// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{DecodeError, Slice};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Maps an object-id prefix to the ref blocks that contain refs pointing at
/// objects sharing that prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjRecord {
    pub prefix: Slice,

    /// Byte offsets of ref blocks, strictly ascending.
    pub offsets: Vec<u64>,
}

impl ObjRecord {
    /// Value layout: `count` followed by the first offset and then
    /// successive deltas, all varints. `extra` is unused for this kind (no
    /// per-record flags) and is always `0`.
    pub(crate) fn decode_value<R: Read>(reader: &mut R) -> Result<Vec<u64>, DecodeError> {
        let count = reader.read_u64_varint()? as usize;
        let mut offsets = Vec::with_capacity(count);

        let mut previous = 0u64;
        for i in 0..count {
            let value = reader.read_u64_varint()?;
            let offset = if i == 0 { value } else { previous + value };

            if i > 0 && offset <= previous {
                return Err(DecodeError::Malformed(
                    "obj record offsets must be strictly ascending".into(),
                ));
            }

            offsets.push(offset);
            previous = offset;
        }

        Ok(offsets)
    }

    #[cfg(test)]
    pub(crate) fn encode_value(offsets: &[u64]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u64_varint(offsets.len() as u64).expect("vec write");

        let mut previous = 0u64;
        for (i, &offset) in offsets.iter().enumerate() {
            let value = if i == 0 { offset } else { offset - previous };
            buf.write_u64_varint(value).expect("vec write");
            previous = offset;
        }

        buf
    }
}
