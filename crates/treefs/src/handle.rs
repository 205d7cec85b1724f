use std::io::{self, SeekFrom};

use crate::dir::DirHandle;
use crate::error::FsResult;
use crate::file::{FileHandle, Whence};
use crate::info::FileInfo;

/// The capability set every open path offers.
///
/// Files implement `read`/`seek`/`stat`/`close` and refuse `readdir`;
/// directories implement `readdir`/`stat`/`close`, read as empty and refuse
/// `seek`.
pub trait VfsFile {
    /// Copy bytes into `buf`. `Ok(0)` with a non-empty `buf` is end of stream.
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    fn seek(&mut self, pos: SeekFrom) -> FsResult<u64>;

    /// Remaining directory entries. `count` is accepted for compatibility
    /// and ignored: all remaining entries are returned.
    fn readdir(&mut self, count: i32) -> FsResult<Vec<FileInfo>>;

    fn stat(&self) -> FsResult<FileInfo>;

    /// Release the underlying object. Safe to call more than once.
    fn close(&mut self) -> FsResult<()>;

    /// Seek with a raw `whence` (0 start, 1 current, 2 end).
    fn seek_raw(&mut self, offset: i64, whence: i32) -> FsResult<u64> {
        let pos = Whence::from_raw(whence)?.seek_from(offset)?;
        self.seek(pos)
    }

    /// Read from the cursor to end of stream.
    fn read_all(&mut self) -> FsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match self.read(&mut chunk)? {
                0 => return Ok(out),
                n => out.extend_from_slice(&chunk[..n]),
            }
        }
    }
}

impl VfsFile for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        FileHandle::read(self, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        FileHandle::seek(self, pos)
    }

    fn readdir(&mut self, count: i32) -> FsResult<Vec<FileInfo>> {
        FileHandle::readdir(self, count)
    }

    fn stat(&self) -> FsResult<FileInfo> {
        FileHandle::stat(self)
    }

    fn close(&mut self) -> FsResult<()> {
        FileHandle::close(self)
    }
}

impl VfsFile for DirHandle {
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        DirHandle::read(self, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        DirHandle::seek(self, pos)
    }

    fn readdir(&mut self, count: i32) -> FsResult<Vec<FileInfo>> {
        DirHandle::readdir(self, count)
    }

    fn stat(&self) -> FsResult<FileInfo> {
        DirHandle::stat(self)
    }

    fn close(&mut self) -> FsResult<()> {
        DirHandle::close(self)
    }
}

/// What [`FileSystem::open`](crate::FileSystem::open) hands back.
#[derive(Debug)]
pub enum Handle {
    File(FileHandle),
    Dir(DirHandle),
}

impl Handle {
    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileHandle> {
        match self {
            Handle::File(file) => Some(file),
            Handle::Dir(_) => None,
        }
    }
}

impl VfsFile for Handle {
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        match self {
            Handle::File(file) => file.read(buf),
            Handle::Dir(dir) => dir.read(buf),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        match self {
            Handle::File(file) => file.seek(pos),
            Handle::Dir(dir) => dir.seek(pos),
        }
    }

    fn readdir(&mut self, count: i32) -> FsResult<Vec<FileInfo>> {
        match self {
            Handle::File(file) => file.readdir(count),
            Handle::Dir(dir) => dir.readdir(count),
        }
    }

    fn stat(&self) -> FsResult<FileInfo> {
        match self {
            Handle::File(file) => file.stat(),
            Handle::Dir(dir) => dir.stat(),
        }
    }

    fn close(&mut self) -> FsResult<()> {
        match self {
            Handle::File(file) => file.close(),
            Handle::Dir(dir) => dir.close(),
        }
    }
}

impl io::Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(VfsFile::read(self, buf)?)
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(VfsFile::seek(self, pos)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use crate::resolve::Node;
    use std::sync::Arc;
    use treefs_store::{Blob, EntryMode, InMemoryObjectStore, ObjectStore, Tree, TreeEntry};
    use treefs_types::ObjectId;

    fn file_handle(content: &[u8]) -> Handle {
        let entry = TreeEntry::new(EntryMode::Regular, "README", ObjectId::from([0u8; 32]));
        Handle::File(FileHandle::new(
            Node::Entry(entry),
            Arc::new(Blob::new(content.to_vec())),
            None,
        ))
    }

    fn dir_handle() -> Handle {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        Handle::Dir(DirHandle::new(Node::Root, Arc::new(Tree::empty()), store, None))
    }

    #[test]
    fn read_all_collects_large_content() {
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut handle = file_handle(&content);
        assert_eq!(handle.read_all().unwrap(), content);
        assert!(handle.read_all().unwrap().is_empty());
    }

    #[test]
    fn seek_raw_maps_whence() {
        let mut handle = file_handle(b"0123456789");
        assert_eq!(handle.seek_raw(3, 0).unwrap(), 3);
        assert_eq!(handle.seek_raw(2, 1).unwrap(), 5);
        assert_eq!(handle.seek_raw(-1, 2).unwrap(), 9);
        assert!(matches!(handle.seek_raw(0, 3), Err(FsError::InvalidWhence(3))));
        assert!(matches!(handle.seek_raw(-1, 0), Err(FsError::InvalidOffset(-1))));
    }

    #[test]
    fn directory_variant() {
        let mut handle = dir_handle();
        assert!(handle.is_dir());
        assert!(handle.as_file_mut().is_none());
        assert!(handle.read_all().unwrap().is_empty());
        assert!(matches!(handle.seek_raw(0, 0), Err(FsError::NotSeekable)));
        assert!(handle.readdir(0).unwrap().is_empty());
        handle.close().unwrap();
        assert!(matches!(handle.stat(), Err(FsError::Closed)));
    }

    #[test]
    fn handles_are_usable_as_trait_objects() {
        let mut handles: Vec<Box<dyn VfsFile>> = vec![
            Box::new(file_handle(b"foo\n")),
            Box::new(dir_handle()),
        ];
        let dirs: Vec<bool> = handles.iter().map(|h| h.stat().unwrap().is_dir()).collect();
        assert_eq!(dirs, vec![false, true]);
        for handle in &mut handles {
            handle.close().unwrap();
            handle.close().unwrap();
        }
    }

    #[test]
    fn std_io_read_on_handle() {
        use std::io::Read;

        let mut handle = file_handle(b"foo\n");
        let mut out = Vec::new();
        Read::read_to_end(&mut handle, &mut out).unwrap();
        assert_eq!(out, b"foo\n");

        let mut dir = dir_handle();
        let err = io::Seek::seek(&mut dir, SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
