// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{Error, HashId, Result};
use byteorder::{BigEndian, ByteOrder};

pub(crate) const MAGIC: &[u8; 4] = b"REFT";
pub(crate) const BLOCK_HEADER_LEN: usize = 4;

/// File header: `"REFT"`, a version byte, and a 3-byte block size. v2 adds a
/// 4-byte hash identifier; v1 always means SHA-1 (see [`HashId::v1_default`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct FileHeader {
    pub version: u8,
    pub block_size: u32,
    pub hash_id: HashId,
}

impl FileHeader {
    pub const V1_LEN: usize = 8;
    pub const V2_LEN: usize = 12;

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::V1_LEN || &bytes[0..4] != MAGIC {
            return Err(Error::Format("bad reftable magic".into()));
        }

        let version = bytes[4];
        let block_size = read_u24(&bytes[5..8]);

        let hash_id = match version {
            1 => HashId::v1_default(),
            2 => {
                if bytes.len() < Self::V2_LEN {
                    return Err(Error::Format("truncated v2 file header".into()));
                }
                HashId::from_tag(BigEndian::read_u32(&bytes[8..12]))?
            }
            other => return Err(Error::Format(format!("unsupported reftable version {other}"))),
        };

        Ok(Self {
            version,
            block_size,
            hash_id,
        })
    }

    #[must_use]
    pub fn len(self) -> usize {
        if self.version == 1 {
            Self::V1_LEN
        } else {
            Self::V2_LEN
        }
    }
}

/// The 4-byte header every block (including the footer's preceding blocks)
/// begins with: a type tag and a 3-byte big-endian length that includes
/// these 4 bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct BlockHeader {
    pub tag: u8,
    pub block_len: u32,
}

impl BlockHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_LEN {
            return Err(Error::Format("truncated block header".into()));
        }

        Ok(Self {
            tag: bytes[0],
            block_len: read_u24(&bytes[1..4]),
        })
    }
}

pub(crate) fn read_u24(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

pub(crate) fn write_u24(buf: &mut Vec<u8>, value: u32) {
    buf.push((value >> 16) as u8);
    buf.push((value >> 8) as u8);
    buf.push(value as u8);
}
