use std::io::{self, SeekFrom};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use treefs_store::{Blob, Object};

use crate::error::{FsError, FsResult};
use crate::info::FileInfo;
use crate::resolve::Node;

/// Seek origin as a raw integer, for callers that pass `whence` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    /// Parse 0 (start), 1 (current) or 2 (end).
    pub fn from_raw(raw: i32) -> FsResult<Self> {
        match raw {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(FsError::InvalidWhence(other)),
        }
    }

    /// Pair with an offset. A negative offset from the start is rejected.
    pub fn seek_from(self, offset: i64) -> FsResult<SeekFrom> {
        match self {
            Whence::Start => u64::try_from(offset)
                .map(SeekFrom::Start)
                .map_err(|_| FsError::InvalidOffset(offset)),
            Whence::Current => Ok(SeekFrom::Current(offset)),
            Whence::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// An open blob.
///
/// Holds one reference to the blob until [`close`](Self::close) or drop.
/// The cursor may be moved past the end; reads there return 0.
#[derive(Debug)]
pub struct FileHandle {
    node: Node,
    blob: Option<Arc<Blob>>,
    offset: u64,
    commit_time: Option<DateTime<Utc>>,
}

impl FileHandle {
    pub(crate) fn new(node: Node, blob: Arc<Blob>, commit_time: Option<DateTime<Utc>>) -> Self {
        Self {
            node,
            blob: Some(blob),
            offset: 0,
            commit_time,
        }
    }

    fn blob(&self) -> FsResult<&Arc<Blob>> {
        self.blob.as_ref().ok_or(FsError::Closed)
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Copy bytes from the cursor into `buf` and advance past them.
    ///
    /// `Ok(0)` means end of file for a non-empty `buf`. An empty `buf`
    /// always gets `Ok(0)`, whatever the cursor, as with [`io::Read`].
    pub fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let data = self.blob()?.contents();
        let start = usize::try_from(self.offset).map_or(data.len(), |o| o.min(data.len()));
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.offset += n as u64;
        Ok(n)
    }

    /// Move the cursor. The result may lie past the end but never before
    /// the start; a seek that would go negative fails and leaves the cursor
    /// where it was.
    pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        let size = self.blob()?.size();
        let (base, delta) = match pos {
            SeekFrom::Start(n) => {
                self.offset = n;
                return Ok(n);
            }
            SeekFrom::Current(delta) => (self.offset, delta),
            SeekFrom::End(delta) => (size, delta),
        };
        self.offset = base
            .checked_add_signed(delta)
            .ok_or(FsError::InvalidOffset(delta))?;
        Ok(self.offset)
    }

    /// Files have no entries.
    pub fn readdir(&mut self, _count: i32) -> FsResult<Vec<FileInfo>> {
        self.blob()?;
        Err(FsError::NotADirectory {
            name: self.node.name().to_string(),
        })
    }

    pub fn stat(&self) -> FsResult<FileInfo> {
        let object = Object::Blob(Arc::clone(self.blob()?));
        Ok(FileInfo::new(&self.node, &object, self.commit_time))
    }

    /// Release the blob. Closing again is a no-op.
    pub fn close(&mut self) -> FsResult<()> {
        self.blob = None;
        Ok(())
    }
}

impl io::Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(FileHandle::read(self, buf)?)
    }
}

impl io::Seek for FileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(FileHandle::seek(self, pos)?)
    }
}
