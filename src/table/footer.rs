// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    block::header::{read_u24, MAGIC},
    Error, HashId, Result,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// The fixed-size trailer every reftable ends with: a repeat of the file
/// header (for re-verification), the sub-stream descriptors, and a CRC32
/// over everything that precedes it.
#[derive(Clone, Debug)]
pub(crate) struct Footer {
    pub version: u8,
    pub block_size: u32,
    pub min_update_index: u64,
    pub max_update_index: u64,
    pub hash_id: HashId,

    pub ref_index_offset: u64,
    pub obj_offset: u64,
    pub obj_id_len: usize,
    pub obj_index_offset: u64,
    pub log_offset: u64,
    pub log_index_offset: u64,
}

impl Footer {
    pub const V1_LEN: u64 = 68;
    pub const V2_LEN: u64 = 72;

    pub fn len_for_version(version: u8) -> u64 {
        if version == 1 {
            Self::V1_LEN
        } else {
            Self::V2_LEN
        }
    }

    /// Parses and CRC-checks the footer, and re-verifies that it begins
    /// with the same header bytes the file opened with.
    pub fn parse(bytes: &[u8], header_bytes: &[u8]) -> Result<Self> {
        let crc_at = bytes.len() - 4;
        let want_crc = BigEndian::read_u32(&bytes[crc_at..]);
        let got_crc = crc32fast::hash(&bytes[..crc_at]);
        if want_crc != got_crc {
            return Err(Error::Format("footer CRC32 mismatch".into()));
        }

        if &bytes[0..4] != MAGIC {
            return Err(Error::Format("footer does not start with reftable magic".into()));
        }
        let version = bytes[4];
        if version != 1 && version != 2 {
            return Err(Error::Format(format!("unsupported reftable version {version}")));
        }
        let block_size = read_u24(&bytes[5..8]);

        // Only `magic | version | block_size` is common to both the file
        // header and the footer: v2's hash id sits right after `block_size`
        // in the file header, but after `min_update`/`max_update` here in
        // the footer, so only this 8-byte prefix can be re-verified.
        const COMMON_PREFIX_LEN: usize = 8;
        if header_bytes.len() < COMMON_PREFIX_LEN || bytes[..COMMON_PREFIX_LEN] != header_bytes[..COMMON_PREFIX_LEN] {
            return Err(Error::Format(
                "footer header bytes do not match the file header".into(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[COMMON_PREFIX_LEN..]);
        let min_update_index = cursor.read_u64::<BigEndian>()?;
        let max_update_index = cursor.read_u64::<BigEndian>()?;

        let hash_id = if version == 1 {
            HashId::v1_default()
        } else {
            HashId::from_tag(cursor.read_u32::<BigEndian>()?)?
        };

        let ref_index_offset = cursor.read_u64::<BigEndian>()?;
        let obj_offset_packed = cursor.read_u64::<BigEndian>()?;
        let obj_index_offset = cursor.read_u64::<BigEndian>()?;
        let log_offset = cursor.read_u64::<BigEndian>()?;
        let log_index_offset = cursor.read_u64::<BigEndian>()?;

        let obj_offset = obj_offset_packed >> 5;
        let obj_id_len = (obj_offset_packed & 0x1f) as usize;

        Ok(Self {
            version,
            block_size,
            min_update_index,
            max_update_index,
            hash_id,
            ref_index_offset,
            obj_offset,
            obj_id_len,
            obj_index_offset,
            log_offset,
            log_index_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::header::write_u24;
    use byteorder::WriteBytesExt;
    use test_log::test;

    fn build_footer(version: u8) -> (Vec<u8>, Vec<u8>) {
        let mut header_bytes = MAGIC.to_vec();
        header_bytes.push(version);
        write_u24(&mut header_bytes, 4096);
        if version == 2 {
            header_bytes.extend_from_slice(&0x7368_6131u32.to_be_bytes());
        }

        let mut footer = MAGIC.to_vec();
        footer.push(version);
        write_u24(&mut footer, 4096);
        footer.write_u64::<BigEndian>(1).unwrap(); // min_update_index
        footer.write_u64::<BigEndian>(5).unwrap(); // max_update_index
        if version == 2 {
            footer.extend_from_slice(&0x7368_6131u32.to_be_bytes());
        }
        footer.write_u64::<BigEndian>(0).unwrap(); // ref_index_offset
        footer.write_u64::<BigEndian>((200u64 << 5) | 20).unwrap(); // obj_offset_packed
        footer.write_u64::<BigEndian>(0).unwrap(); // obj_index_offset
        footer.write_u64::<BigEndian>(300).unwrap(); // log_offset
        footer.write_u64::<BigEndian>(0).unwrap(); // log_index_offset

        let crc = crc32fast::hash(&footer);
        footer.write_u32::<BigEndian>(crc).unwrap();

        (footer, header_bytes)
    }

    #[test]
    fn parses_v1_footer() {
        let (footer_bytes, header_bytes) = build_footer(1);
        let footer = Footer::parse(&footer_bytes, &header_bytes).unwrap();

        assert_eq!(1, footer.min_update_index);
        assert_eq!(5, footer.max_update_index);
        assert_eq!(200, footer.obj_offset);
        assert_eq!(20, footer.obj_id_len);
        assert_eq!(300, footer.log_offset);
    }

    #[test]
    fn parses_v2_footer() {
        let (footer_bytes, header_bytes) = build_footer(2);
        let footer = Footer::parse(&footer_bytes, &header_bytes).unwrap();
        assert_eq!(HashId::Sha1, footer.hash_id);
    }

    #[test]
    fn mutated_byte_fails_crc() {
        let (mut footer_bytes, header_bytes) = build_footer(1);
        let last = footer_bytes.len() - 1;
        footer_bytes[last] ^= 0xff;

        let err = Footer::parse(&footer_bytes, &header_bytes).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn mismatched_header_is_format_error() {
        let (footer_bytes, _) = build_footer(1);
        let wrong_header = vec![0u8; 8];

        let err = Footer::parse(&footer_bytes, &wrong_header).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    /// Hand-assembled footer bytes, independent of `build_footer` (and of
    /// `tests/common`'s `TableBuilder`), pinning the exact field order the
    /// footer diagram specifies: `magic | version | block_size(3) |
    /// min_update(8) | max_update(8) | hash_id(4, v2 only) | ...`.
    #[test]
    fn v2_footer_byte_layout_places_hash_id_after_min_and_max_update() {
        let mut header_bytes = MAGIC.to_vec();
        header_bytes.push(2);
        write_u24(&mut header_bytes, 4096);
        header_bytes.extend_from_slice(&0x7368_6131u32.to_be_bytes());

        let mut footer = Vec::new();
        footer.extend_from_slice(b"REFT"); // 0..4
        footer.push(2); // 4: version
        footer.extend_from_slice(&[0, 0x10, 0]); // 5..8: block_size = 4096
        footer.extend_from_slice(&7u64.to_be_bytes()); // 8..16: min_update_index
        footer.extend_from_slice(&42u64.to_be_bytes()); // 16..24: max_update_index
        footer.extend_from_slice(&0x7368_6131u32.to_be_bytes()); // 24..28: hash_id (sha1)
        footer.extend_from_slice(&0u64.to_be_bytes()); // 28..36: ref_index_offset
        footer.extend_from_slice(&((9u64 << 5) | 20).to_be_bytes()); // 36..44: obj_offset_packed
        footer.extend_from_slice(&0u64.to_be_bytes()); // 44..52: obj_index_offset
        footer.extend_from_slice(&100u64.to_be_bytes()); // 52..60: log_offset
        footer.extend_from_slice(&0u64.to_be_bytes()); // 60..68: log_index_offset

        let crc = crc32fast::hash(&footer);
        footer.extend_from_slice(&crc.to_be_bytes()); // 68..72

        assert_eq!(Footer::V2_LEN as usize, footer.len());

        let parsed = Footer::parse(&footer, &header_bytes).unwrap();
        assert_eq!(7, parsed.min_update_index);
        assert_eq!(42, parsed.max_update_index);
        assert_eq!(HashId::Sha1, parsed.hash_id);
        assert_eq!(9, parsed.obj_offset);
        assert_eq!(20, parsed.obj_id_len);
        assert_eq!(100, parsed.log_offset);
    }
}
