//! The filesystem root and `open`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use treefs_refs::Ref;
use treefs_repo::{PeeledTree, Repository};
use treefs_store::{Object, ObjectKind, ObjectStore, StoreError, Tree};
use treefs_types::ObjectId;

use crate::dir::DirHandle;
use crate::error::FsResult;
use crate::file::FileHandle;
use crate::handle::Handle;
use crate::resolve::{self, Node, Resolved};

/// Anything that can open a slash-separated path.
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &str) -> FsResult<Handle>;
}

/// A filesystem rooted at one immutable tree.
///
/// Cheap to clone; every clone shares the store and the root tree.
#[derive(Clone)]
pub struct TreeFs {
    store: Arc<dyn ObjectStore>,
    root_id: ObjectId,
    root: Arc<Tree>,
    commit_time: Option<DateTime<Utc>>,
}

impl TreeFs {
    /// Root the filesystem at the tree `tree_id`.
    pub fn from_tree(store: Arc<dyn ObjectStore>, tree_id: ObjectId) -> FsResult<Self> {
        let root = store.lookup_tree(&tree_id)?;
        Ok(Self {
            store,
            root_id: tree_id,
            root,
            commit_time: None,
        })
    }

    /// Root the filesystem at an already peeled tree, keeping the commit time
    /// when there is one.
    pub fn from_peeled(store: Arc<dyn ObjectStore>, peeled: PeeledTree) -> Self {
        let commit_time = peeled.commit_time();
        Self {
            store,
            root_id: peeled.tree_id,
            root: peeled.tree,
            commit_time,
        }
    }

    /// Root the filesystem at the tree `reference` peels to.
    pub fn from_reference(repo: &Repository, reference: &Ref) -> FsResult<Self> {
        let peeled = repo.peel_to_tree(reference)?;
        Ok(Self::from_peeled(Arc::clone(repo.store()), peeled))
    }

    /// Look up `name` (`HEAD` or a full `refs/...` name) and root the
    /// filesystem at the tree it peels to.
    pub fn from_reference_name(repo: &Repository, name: &str) -> FsResult<Self> {
        let reference = repo.lookup_reference(name)?;
        Self::from_reference(repo, &reference)
    }

    /// Report `time` as the modification time of every entry.
    pub fn with_mod_time(mut self, time: DateTime<Utc>) -> Self {
        self.commit_time = Some(time);
        self
    }

    pub fn root_id(&self) -> ObjectId {
        self.root_id
    }

    pub fn commit_time(&self) -> Option<DateTime<Utc>> {
        self.commit_time
    }
}

impl FileSystem for TreeFs {
    fn open(&self, path: &str) -> FsResult<Handle> {
        let Resolved { node, object } = resolve::resolve(self.store.as_ref(), &self.root, path)?;
        debug!(path, entry = node.name(), kind = %object.kind(), "opened");
        match object {
            Object::Blob(blob) => Ok(Handle::File(FileHandle::new(node, blob, self.commit_time))),
            Object::Tree(tree) => Ok(Handle::Dir(DirHandle::new(
                node,
                tree,
                Arc::clone(&self.store),
                self.commit_time,
            ))),
            // `resolve` only loads blobs and trees.
            Object::Commit(_) => Err(StoreError::KindMismatch {
                id: match &node {
                    Node::Root => self.root_id,
                    Node::Entry(entry) => entry.object_id,
                },
                expected: node.mode().object_kind(),
                actual: ObjectKind::Commit,
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for TreeFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeFs")
            .field("root", &self.root_id)
            .field("commit_time", &self.commit_time)
            .finish_non_exhaustive()
    }
}
