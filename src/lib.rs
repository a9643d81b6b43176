// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A read path implementation for the reftable format: a sorted,
//! block-structured file format for storing git refs and reflogs.
//!
//! ##### NOTE
//!
//! > This crate only reads reftables. It does not write them: there is no
//! > compaction, no stack maintenance, and no way to produce a new table
//! > from a set of updates. You bring already-written `.ref` files (or any
//! > [`BlockSource`] serving their bytes) and query them.
//!
//! ##### About
//!
//! A single reftable ([`TableReader`]) is a sequence of sorted, prefix
//! compressed blocks holding one or more of four record kinds: ref records,
//! reflog records, obj records (an optional index from object id to the ref
//! blocks that point at it) and index records (an optional index over a
//! sub-stream, used once that sub-stream spans more than one block).
//!
//! Real git setups stack many reftables on top of each other instead of
//! rewriting one big table on every update. [`MergedTable`] presents such a
//! stack as a single logical view, with the newest table winning ties and an
//! option to suppress tombstone (deletion) records from the merged output.
//!
//! # Example usage
//!
//! ```no_run
//! use reftable::{BlockSource, FileBlockSource, MergedTable, TableReader};
//! use std::sync::Arc;
//!
//! # fn main() -> reftable::Result<()> {
//! let source = FileBlockSource::open("tables/0001.ref")?;
//! let table = TableReader::open(Box::new(source))?;
//!
//! let mut it = table.seek_ref(b"refs/heads/main")?;
//! while let Some(record) = it.next()? {
//!     let r = record.into_ref()?;
//!     println!("{:?} -> {:?}", r.name, r.value);
//! }
//!
//! let hash_id = table.hash_id();
//! let stack = MergedTable::new(vec![table], hash_id, /* suppress_deletions */ true)?;
//! let mut it = stack.seek_ref(b"refs/heads/main")?;
//! while let Some(record) = it.next()? {
//!     let _ = record;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod binary_search;
mod block;
mod block_source;
mod coding;
mod config;
mod error;
mod hash;
mod merge;
mod merged_table;
mod record;
mod slice;
mod table;

pub use block_source::{BlockSource, FileBlockSource, SliceBlockSource};
pub use coding::DecodeError;
pub use config::Options;
pub use error::{Error, Result};
pub use hash::HashId;
pub use merged_table::{MergedTable, MergedTableIter};
pub use record::{IndexRecord, LogRecord, LogValue, ObjRecord, Record, RecordKind, RefRecord, RefValue};
pub use slice::Slice;
pub use table::{ObjIter, TableIter, TableReader};
