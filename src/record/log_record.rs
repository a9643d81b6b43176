// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{coding::read_exact_vec, DecodeError, Slice};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// A reflog entry's payload. `Deletion` marks that the named ref had no
/// reflog entry at this update index (a log tombstone).
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    Deletion,
    Update {
        old_hash: Slice,
        new_hash: Slice,
        name: Slice,
        email: Slice,
        time: u64,
        /// Minutes east of UTC, as on the committer line of a commit.
        tz_offset: i16,
        message: Slice,
    },
}

/// One reflog entry for `name` at `update_index`.
///
/// Unlike ref records, the update index here is absolute: it is not rebased
/// against a table's `min_update_index` because it is already embedded,
/// inverted, in the record's on-disk key suffix.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub name: Slice,
    pub update_index: u64,
    pub value: LogValue,
}

impl LogRecord {
    const TYPE_DELETION: u8 = 0;
    const TYPE_UPDATE: u8 = 1;

    /// The on-disk key: ref name followed by the bitwise complement of
    /// `update_index` as 8 bytes big-endian, so that entries for the same
    /// ref sort with the newest update index first.
    #[must_use]
    pub fn key(&self) -> Slice {
        let mut buf = Vec::with_capacity(self.name.len() + 8);
        buf.extend_from_slice(&self.name);
        buf.write_u64::<BigEndian>(!self.update_index).expect("vec write");
        Slice::from(buf)
    }

    /// Splits a log-record key into `(name, update_index)`. Fails if the key
    /// is shorter than the 8-byte suffix.
    pub(crate) fn split_key(key: &[u8]) -> Result<(Slice, u64), DecodeError> {
        if key.len() < 8 {
            return Err(DecodeError::Malformed(
                "log record key shorter than the 8-byte update-index suffix".into(),
            ));
        }

        let split = key.len() - 8;
        let mut suffix = &key[split..];
        let inverted = suffix.read_u64::<BigEndian>()?;

        Ok((Slice::from(&key[..split]), !inverted))
    }

    pub(crate) fn decode_value<R: Read>(
        extra: u8,
        reader: &mut R,
        hash_size: usize,
    ) -> Result<LogValue, DecodeError> {
        match extra {
            Self::TYPE_DELETION => Ok(LogValue::Deletion),
            Self::TYPE_UPDATE => {
                let old_hash = Slice::from(read_exact_vec(reader, hash_size)?);
                let new_hash = Slice::from(read_exact_vec(reader, hash_size)?);

                let name_len = reader.read_u64_varint()? as usize;
                let name = Slice::from(read_exact_vec(reader, name_len)?);

                let email_len = reader.read_u64_varint()? as usize;
                let email = Slice::from(read_exact_vec(reader, email_len)?);

                let time = reader.read_u64_varint()?;
                let tz_offset = reader.read_i16::<BigEndian>()?;

                let message_len = reader.read_u64_varint()? as usize;
                let message = Slice::from(read_exact_vec(reader, message_len)?);

                Ok(LogValue::Update {
                    old_hash,
                    new_hash,
                    name,
                    email,
                    time,
                    tz_offset,
                    message,
                })
            }
            other => Err(DecodeError::Malformed(format!(
                "unknown log value type {other}"
            ))),
        }
    }

    #[cfg(test)]
    pub(crate) fn encode_value(value: &LogValue) -> (u8, Vec<u8>) {
        let mut buf = Vec::new();

        let extra = match value {
            LogValue::Deletion => Self::TYPE_DELETION,
            LogValue::Update {
                old_hash,
                new_hash,
                name,
                email,
                time,
                tz_offset,
                message,
            } => {
                buf.write_all(old_hash).expect("vec write");
                buf.write_all(new_hash).expect("vec write");
                buf.write_u64_varint(name.len() as u64).expect("vec write");
                buf.write_all(name).expect("vec write");
                buf.write_u64_varint(email.len() as u64).expect("vec write");
                buf.write_all(email).expect("vec write");
                buf.write_u64_varint(*time).expect("vec write");
                buf.write_i16::<BigEndian>(*tz_offset).expect("vec write");
                buf.write_u64_varint(message.len() as u64).expect("vec write");
                buf.write_all(message).expect("vec write");
                Self::TYPE_UPDATE
            }
        };

        (extra, buf)
    }
}
