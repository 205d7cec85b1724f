use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use treefs_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents).
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// A root tree plus authorship and parent commits.
    Commit,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The blob's bytes.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Length of the content in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000). The blob holds the link target.
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value (for display/serialization).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// The object kind an entry with this mode must point at.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Directory => ObjectKind::Tree,
            Self::Regular | Self::Executable | Self::Symlink => ObjectKind::Blob,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory).
    pub mode: EntryMode,
    /// Entry name (filename or directory name).
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Returns `true` if the entry points at a subtree.
    pub fn is_tree(&self) -> bool {
        self.mode == EntryMode::Directory
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Directory listing object (analogous to git tree).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tree {
    /// Entries sorted by name; `get` binary-searches them.
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check entry names: non-empty, no `/` or NUL, not `.`/`..`, unique.
    pub fn validate(&self) -> StoreResult<()> {
        for entry in &self.entries {
            let reason = if entry.name.is_empty() {
                Some("name must not be empty")
            } else if entry.name.contains('/') || entry.name.contains('\0') {
                Some("name must not contain '/' or NUL")
            } else if entry.name == "." || entry.name == ".." {
                Some("name must not be '.' or '..'")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(StoreError::InvalidEntryName {
                    name: entry.name.clone(),
                    reason: reason.into(),
                });
            }
        }
        for pair in self.entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(StoreError::InvalidEntryName {
                    name: pair[0].name.clone(),
                    reason: "duplicate name".into(),
                });
            }
        }
        Ok(())
    }

    /// Look up an immediate entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Entry at position `index` in name order.
    pub fn entry_by_index(&self, index: usize) -> Option<&TreeEntry> {
        self.entries.get(index)
    }

    /// Resolve a slash-separated path relative to this tree.
    ///
    /// Intermediate segments are descended through `store`. Empty segments
    /// are skipped. Returns `Ok(None)` when any segment is missing or an
    /// intermediate segment names something other than a subtree; an empty
    /// path also yields `None` since it names no entry.
    pub fn entry_by_path<S>(&self, store: &S, path: &str) -> StoreResult<Option<TreeEntry>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return Ok(None);
        };
        let Some(mut entry) = self.get(first).cloned() else {
            return Ok(None);
        };
        for segment in segments {
            if !entry.is_tree() {
                return Ok(None);
            }
            let subtree = store.lookup_tree(&entry.object_id)?;
            match subtree.get(segment) {
                Some(next) => entry = next.clone(),
                None => return Ok(None),
            }
        }
        Ok(Some(entry))
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Encoded {
            entries: Vec<TreeEntry>,
        }
        Encoded::deserialize(deserializer).map(|encoded| Tree::new(encoded.entries))
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Author or committer identity with a timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when: when.trunc_subsecs(0),
        }
    }

    /// Signature stamped with the current time, truncated to whole seconds.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, Utc::now())
    }
}

/// Snapshot of a root tree with its history (analogous to git commit).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of this commit.
    pub tree: ObjectId,
    /// Parent commits, empty for a root commit.
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// A decoded object, shared behind an `Arc`.
///
/// Cloning an `Object` takes another reference; the decoded data is freed
/// when the last clone is dropped.
#[derive(Clone, Debug)]
pub enum Object {
    Blob(Arc<Blob>),
    Tree(Arc<Tree>),
    Commit(Arc<Commit>),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }
}
