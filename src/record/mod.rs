// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The four record kinds a table's blocks can hold, and the tagged variant
//! that lets the rest of the crate stay agnostic to which one it's looking
//! at.

mod index_record;
mod log_record;
mod obj_record;
mod ref_record;

pub use index_record::IndexRecord;
pub use log_record::{LogRecord, LogValue};
pub use obj_record::ObjRecord;
pub use ref_record::{RefRecord, RefValue};

use crate::Slice;

/// Discriminates the four record kinds, and doubles as the block-type tag
/// stored in a block header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordKind {
    Ref,
    Log,
    Obj,
    Index,
}

impl RecordKind {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Ref => b'r',
            Self::Log => b'l',
            Self::Obj => b'o',
            Self::Index => b'i',
        }
    }

    pub(crate) fn from_tag(tag: u8) -> crate::Result<Self> {
        match tag {
            b'r' => Ok(Self::Ref),
            b'l' => Ok(Self::Log),
            b'o' => Ok(Self::Obj),
            b'i' => Ok(Self::Index),
            other => Err(crate::Error::Format(format!(
                "unknown block type tag {:?}",
                other as char
            ))),
        }
    }
}

/// A decoded record from one of a table's sub-streams.
///
/// Cloning a [`Record`] is cheap: every byte-bearing field is a [`Slice`],
/// so `copy_from`-style deep copies (per the source semantics, a dequeued
/// record must be copied into a caller-owned shell before the original is
/// released) fall out of `#[derive(Clone)]` instead of needing a bespoke
/// method.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Ref(RefRecord),
    Log(LogRecord),
    Obj(ObjRecord),
    Index(IndexRecord),
}

impl Record {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Ref(_) => RecordKind::Ref,
            Self::Log(_) => RecordKind::Log,
            Self::Obj(_) => RecordKind::Obj,
            Self::Index(_) => RecordKind::Index,
        }
    }

    /// The record's sort key, exactly as it appears (or is derived) on disk.
    #[must_use]
    pub fn key(&self) -> Slice {
        match self {
            Self::Ref(r) => r.name.clone(),
            Self::Log(r) => r.key(),
            Self::Obj(r) => r.prefix.clone(),
            Self::Index(r) => r.last_key.clone(),
        }
    }

    #[must_use]
    pub fn is_deletion(&self) -> bool {
        match self {
            Self::Ref(r) => matches!(r.value, RefValue::Deletion),
            Self::Log(r) => matches!(r.value, LogValue::Deletion),
            Self::Obj(_) | Self::Index(_) => false,
        }
    }

    /// Unwraps a ref record, failing with `api-misuse` if this is some other
    /// kind. Used by callers that pulled a record out of a sub-stream they
    /// know to be refs.
    pub fn into_ref(self) -> crate::Result<RefRecord> {
        match self {
            Self::Ref(r) => Ok(r),
            other => Err(api_misuse(RecordKind::Ref, other.kind())),
        }
    }

    pub fn into_log(self) -> crate::Result<LogRecord> {
        match self {
            Self::Log(r) => Ok(r),
            other => Err(api_misuse(RecordKind::Log, other.kind())),
        }
    }

    pub fn into_obj(self) -> crate::Result<ObjRecord> {
        match self {
            Self::Obj(r) => Ok(r),
            other => Err(api_misuse(RecordKind::Obj, other.kind())),
        }
    }

    pub fn into_index(self) -> crate::Result<IndexRecord> {
        match self {
            Self::Index(r) => Ok(r),
            other => Err(api_misuse(RecordKind::Index, other.kind())),
        }
    }
}

fn api_misuse(want: RecordKind, got: RecordKind) -> crate::Error {
    crate::Error::ApiMisuse(format!(
        "expected a {:?} record, found a {:?} record",
        want, got
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn tag_round_trip() {
        for kind in [RecordKind::Ref, RecordKind::Log, RecordKind::Obj, RecordKind::Index] {
            assert_eq!(kind, RecordKind::from_tag(kind.tag()).unwrap());
        }
    }

    #[test]
    fn unknown_tag_is_format_error() {
        assert!(RecordKind::from_tag(b'?').is_err());
    }

    #[test]
    fn into_wrong_kind_is_api_misuse() {
        let record = Record::Index(IndexRecord {
            last_key: Slice::from("a"),
            offset: 1,
        });
        let err = record.into_ref().unwrap_err();
        assert!(matches!(err, crate::Error::ApiMisuse(_)));
    }
}
