// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{DecodeError, Slice};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Points at a lower-level block, keyed by that block's last key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    pub last_key: Slice,
    pub offset: u64,
}

impl IndexRecord {
    pub(crate) fn decode_value<R: Read>(reader: &mut R) -> Result<u64, DecodeError> {
        Ok(reader.read_u64_varint()?)
    }

    #[cfg(test)]
    pub(crate) fn encode_value(offset: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u64_varint(offset).expect("vec write");
        buf
    }
}
