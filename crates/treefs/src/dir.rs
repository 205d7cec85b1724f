use std::io::SeekFrom;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use treefs_store::{Object, ObjectStore, Tree};

use crate::error::{FsError, FsResult};
use crate::info::FileInfo;
use crate::resolve::{self, Node};

/// An open subtree.
///
/// Enumeration moves forward only: every entry is handed out by exactly one
/// [`readdir`](Self::readdir) call.
pub struct DirHandle {
    node: Node,
    tree: Option<Arc<Tree>>,
    store: Arc<dyn ObjectStore>,
    cursor: usize,
    commit_time: Option<DateTime<Utc>>,
}

impl DirHandle {
    pub(crate) fn new(
        node: Node,
        tree: Arc<Tree>,
        store: Arc<dyn ObjectStore>,
        commit_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            node,
            tree: Some(tree),
            store,
            cursor: 0,
            commit_time,
        }
    }

    fn tree(&self) -> FsResult<&Arc<Tree>> {
        self.tree.as_ref().ok_or(FsError::Closed)
    }

    /// Directories have no byte content: always end of stream.
    pub fn read(&mut self, _buf: &mut [u8]) -> FsResult<usize> {
        self.tree()?;
        Ok(0)
    }

    pub fn seek(&mut self, _pos: SeekFrom) -> FsResult<u64> {
        self.tree()?;
        Err(FsError::NotSeekable)
    }

    /// Return every entry not yet returned, in tree order.
    ///
    /// `count` is ignored. Each entry's object is looked up to fill in its
    /// size; if any lookup fails nothing is consumed and the error is
    /// returned.
    pub fn readdir(&mut self, _count: i32) -> FsResult<Vec<FileInfo>> {
        let tree = Arc::clone(self.tree()?);
        let remaining = (self.cursor..tree.len()).filter_map(|index| tree.entry_by_index(index));
        let mut infos = Vec::with_capacity(tree.len().saturating_sub(self.cursor));
        for entry in remaining {
            let object = resolve::load(self.store.as_ref(), entry)?;
            infos.push(FileInfo::new(
                &Node::Entry(entry.clone()),
                &object,
                self.commit_time,
            ));
        }
        self.cursor += infos.len();
        Ok(infos)
    }

    pub fn stat(&self) -> FsResult<FileInfo> {
        let object = Object::Tree(Arc::clone(self.tree()?));
        Ok(FileInfo::new(&self.node, &object, self.commit_time))
    }

    /// Release the tree. Closing again is a no-op.
    pub fn close(&mut self) -> FsResult<()> {
        self.tree = None;
        Ok(())
    }
}

impl std::fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirHandle")
            .field("name", &self.node.name())
            .field("cursor", &self.cursor)
            .field("closed", &self.tree.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treefs_store::{EntryMode, InMemoryObjectStore, TreeEntry};
    use treefs_types::ObjectId;

    fn fixture() -> (Arc<InMemoryObjectStore>, Arc<Tree>) {
        let store = Arc::new(InMemoryObjectStore::new());
        let a = store.write_blob(b"aaaa").unwrap();
        let b = store.write_blob(b"bb").unwrap();
        let sub = store.write_tree(&Tree::empty()).unwrap();
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "b.txt", b),
            TreeEntry::new(EntryMode::Regular, "a.txt", a),
            TreeEntry::new(EntryMode::Directory, "sub", sub),
        ]);
        (store, Arc::new(tree))
    }

    fn open_root(store: Arc<InMemoryObjectStore>, tree: Arc<Tree>) -> DirHandle {
        DirHandle::new(Node::Root, tree, store, None)
    }

    #[test]
    fn readdir_returns_everything_once() {
        let (store, tree) = fixture();
        let mut dir = open_root(store, tree);

        let infos = dir.readdir(1).unwrap();
        let names: Vec<&str> = infos.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(infos[0].size(), 4);
        assert_eq!(infos[1].size(), 2);
        assert!(infos[2].is_dir());
        assert_eq!(infos[2].size(), 0);

        assert!(dir.readdir(0).unwrap().is_empty());
        assert!(dir.readdir(-1).unwrap().is_empty());
    }

    #[test]
    fn readdir_failure_consumes_nothing() {
        let store = Arc::new(InMemoryObjectStore::new());
        let present = store.write_blob(b"here").unwrap();
        let tree = Arc::new(Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a", present),
            TreeEntry::new(EntryMode::Regular, "b", ObjectId::from([0xee; 32])),
            TreeEntry::new(EntryMode::Regular, "c", present),
        ]));
        let mut dir = open_root(store, tree);
        assert!(matches!(dir.readdir(0), Err(FsError::Store(_))));
        assert!(format!("{dir:?}").contains("cursor: 0"));
        assert!(matches!(dir.readdir(0), Err(FsError::Store(_))));
    }

    #[test]
    fn readdir_on_empty_tree() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut dir = open_root(store, Arc::new(Tree::empty()));
        assert!(dir.readdir(0).unwrap().is_empty());
        assert!(format!("{dir:?}").contains("cursor: 0"));
    }

    #[test]
    fn read_and_seek_on_directory() {
        let (store, tree) = fixture();
        let mut dir = open_root(store, tree);
        let mut buf = [0u8; 16];
        assert_eq!(dir.read(&mut buf).unwrap(), 0);
        assert!(matches!(dir.seek(SeekFrom::Start(0)), Err(FsError::NotSeekable)));
    }

    #[test]
    fn stat_directory() {
        let (store, tree) = fixture();
        let dir = open_root(store, tree);
        let info = dir.stat().unwrap();
        assert_eq!(info.name(), "");
        assert_eq!(info.size(), 0);
        assert!(info.is_dir());
    }

    #[test]
    fn close_is_idempotent() {
        let (store, tree) = fixture();
        let mut dir = open_root(store, Arc::clone(&tree));
        assert_eq!(Arc::strong_count(&tree), 2);
        dir.close().unwrap();
        dir.close().unwrap();
        assert_eq!(Arc::strong_count(&tree), 1);
        assert!(matches!(dir.readdir(0), Err(FsError::Closed)));
        assert!(matches!(dir.stat(), Err(FsError::Closed)));
        assert!(format!("{dir:?}").contains("closed: true"));
    }
}
