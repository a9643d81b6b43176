// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::error::Error;

/// SHA-1 4-byte tag, `"sha1"`.
const SHA1_ID: u32 = 0x7368_6131;

/// SHA-256 4-byte tag, `"s256"`.
const SHA256_ID: u32 = 0x7332_3536;

/// Hash algorithm a table declares for all its hash-bearing records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HashId {
    Sha1,
    Sha256,
}

impl HashId {
    /// Width in bytes of hashes stored under this identifier.
    #[must_use]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Identifier used in the v1 file header, which has no explicit hash id
    /// field and always means SHA-1.
    #[must_use]
    pub const fn v1_default() -> Self {
        Self::Sha1
    }

    pub(crate) fn from_tag(tag: u32) -> crate::Result<Self> {
        match tag {
            SHA1_ID => Ok(Self::Sha1),
            SHA256_ID => Ok(Self::Sha256),
            other => Err(Error::Format(format!(
                "unknown hash identifier 0x{other:08x}"
            ))),
        }
    }
}
