// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::DecodeError;

/// Errors that can occur while reading a reftable.
#[derive(Debug)]
pub enum Error {
    /// I/O error from the underlying block source.
    Io(std::io::Error),

    /// The bytes on disk do not form a valid reftable (bad magic, unknown
    /// version, unknown hash identifier, malformed varint, illegal
    /// block-type chain, CRC mismatch, ...).
    Format(String),

    /// Caller asked a sub-stream for a record kind it doesn't hold.
    ApiMisuse(String),

    /// The requested file does not exist.
    NotExist,

    /// Decompressing a log block's DEFLATE payload failed.
    Zlib(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Format(msg) => write!(f, "reftable format error: {msg}"),
            Self::ApiMisuse(msg) => write!(f, "API misuse: {msg}"),
            Self::NotExist => write!(f, "table does not exist"),
            Self::Zlib(msg) => write!(f, "inflate error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Io(e) => Self::Io(e),
            DecodeError::Malformed(msg) => Self::Format(msg),
        }
    }
}

/// Reftable result.
pub type Result<T> = std::result::Result<T, Error>;
