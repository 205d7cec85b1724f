use chrono::{DateTime, Utc};
use treefs_store::{EntryMode, Object};

use crate::resolve::Node;

/// What kind of filesystem object an entry presents as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular or executable blob.
    Regular,
    /// Subtree.
    Directory,
    /// Any other entry mode (symlinks). Opened as a file, but not reported
    /// as a regular one.
    Other,
}

impl From<EntryMode> for FileType {
    fn from(mode: EntryMode) -> Self {
        match mode {
            EntryMode::Regular | EntryMode::Executable => FileType::Regular,
            EntryMode::Directory => FileType::Directory,
            EntryMode::Symlink => FileType::Other,
        }
    }
}

/// Stat-like view of a tree entry and the object it points at.
///
/// A plain value: it holds no reference to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    name: String,
    size: u64,
    mode: EntryMode,
    mod_time: DateTime<Utc>,
}

impl FileInfo {
    /// Build the info for `node`, whose object has already been resolved.
    ///
    /// `commit_time` is the time of the commit the filesystem was bound
    /// through; without one the current time is reported.
    pub fn new(node: &Node, object: &Object, commit_time: Option<DateTime<Utc>>) -> Self {
        let size = match object {
            Object::Blob(blob) => blob.size(),
            Object::Tree(_) | Object::Commit(_) => 0,
        };
        Self {
            name: node.name().to_string(),
            size,
            mode: node.mode(),
            mod_time: commit_time.unwrap_or_else(Utc::now),
        }
    }

    /// Entry name; empty for the filesystem root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content length for blobs, zero for everything else.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_type(&self) -> FileType {
        self.mode.into()
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// Raw mode of the tree entry.
    pub fn entry_mode(&self) -> EntryMode {
        self.mode
    }

    /// Commit time when known, otherwise the time this info was built.
    /// Objects carry no timestamps of their own.
    pub fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }
}
