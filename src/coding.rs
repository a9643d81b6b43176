// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::Read;

/// Error while decoding a block, record, header or footer.
///
/// Kept separate from [`crate::Error`] so parsing code can freely use `?`
/// against a small local error type; it converts into the crate-level error
/// at the boundary (see `impl From<DecodeError> for crate::Error`).
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error
    Io(std::io::Error),

    /// Malformed data: bad magic, unknown tag, truncated buffer, a length
    /// or varint that doesn't fit the remaining bytes, and so on.
    Malformed(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Malformed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Trait for types that can be parsed out of a byte stream.
///
/// There is no symmetric `Encode` trait exposed by the crate: the write path
/// is out of scope. Test fixtures build raw bytes directly (see
/// `tests/common`).
pub trait Decode {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

/// Reads exactly `len` bytes and returns them as a `Vec<u8>`.
pub(crate) fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
