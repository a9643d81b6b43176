// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Small set of reader-side knobs. There is no write path, so this carries
//! none of the block-size/compression-level options a writer would need.

/// Tunables for opening and querying tables.
#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Re-verify the obj-index lookup result by comparing the queried
    /// object id against the candidate ref's own hash, instead of trusting
    /// the index's prefix match. Off by default: the index is expected to
    /// be trustworthy, and the unindexed path already does this filtering
    /// unconditionally.
    pub reverify_object_lookup: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reverify_object_lookup: false,
        }
    }
}
