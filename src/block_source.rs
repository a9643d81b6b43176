// Copyright (c) 2024-present, reftable-rs authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The block source is the table's random-access byte provider.
//!
//! The rest of the crate treats it as an opaque collaborator: only
//! `size`/`read`/`release`/`close` matter. This module ships two concrete
//! implementations: [`FileBlockSource`], a `pread`-style file backend that
//! seeks and reads under a lock rather than requiring `&mut self` at every
//! call site, and [`SliceBlockSource`], for building tables in memory
//! (mainly useful in tests).

use crate::Slice;
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    sync::{Arc, Mutex},
};

/// A byte range handed out by a [`BlockSource`].
///
/// Backed by the `Arc`-based [`Slice`], so dropping the last handle already
/// frees the bytes; [`BlockSource::release`] is still provided explicitly so
/// call sites have one place to mark "done with this block" regardless of
/// what a given backend needs to do about it.
pub type Block = Slice;

/// Random-access byte provider over one table file.
pub trait BlockSource: Send + Sync {
    /// Total size in bytes of the underlying table.
    fn size(&self) -> crate::Result<u64>;

    /// Reads exactly `len` bytes starting at `off`. Callers must clamp
    /// `off + len` to `size()` themselves; reading past the end is an I/O
    /// error here.
    fn read(&self, off: u64, len: usize) -> crate::Result<Block>;

    /// Returns a block to the source. A no-op for in-memory/owned backends;
    /// kept so call sites have a consistent acquire/release pair regardless
    /// of backend.
    fn release(&self, _block: Block) {}

    /// Closes the source, releasing any file descriptor.
    fn close(&self) {}
}

/// A [`BlockSource`] backed by a single file, read with absolute-offset
/// reads rather than a shared seek cursor, so concurrent readers don't race
/// each other's `seek`+`read` pairs.
pub struct FileBlockSource {
    file: Mutex<File>,
    size: u64,
}

impl FileBlockSource {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                crate::Error::NotExist
            } else {
                crate::Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl BlockSource for FileBlockSource {
    fn size(&self) -> crate::Result<u64> {
        Ok(self.size)
    }

    fn read(&self, off: u64, len: usize) -> crate::Result<Block> {
        let mut buf = vec![0u8; len];

        #[allow(clippy::expect_used)]
        let mut file = self.file.lock().expect("lock is poisoned");
        file.seek(SeekFrom::Start(off))?;
        file.read_exact(&mut buf)?;

        Ok(Slice::from(buf))
    }
}

/// An in-memory [`BlockSource`] over an owned byte buffer.
///
/// Used by tests and tools that already hold the whole table in memory.
pub struct SliceBlockSource(Arc<[u8]>);

impl SliceBlockSource {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes.into_boxed_slice()))
    }
}

impl BlockSource for SliceBlockSource {
    fn size(&self) -> crate::Result<u64> {
        Ok(self.0.len() as u64)
    }

    fn read(&self, off: u64, len: usize) -> crate::Result<Block> {
        let off = off as usize;
        let end = off.checked_add(len).ok_or_else(|| {
            crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "offset overflow",
            ))
        })?;

        let slice = self.0.get(off..end).ok_or_else(|| {
            crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read {len} bytes at {off} past end of {}-byte table", self.0.len()),
            ))
        })?;

        Ok(Slice::from(slice))
    }
}
