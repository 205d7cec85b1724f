use std::sync::Arc;

use treefs_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, Object, ObjectKind, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Writing the same object twice
///   yields the same ID and stores it once.
/// - Concurrent reads are always safe (objects are immutable).
/// - A missing object is `StoreError::NotFound`, never a panic.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read and decode an object by its content-addressed ID.
    fn lookup(&self, id: &ObjectId) -> StoreResult<Object>;

    /// Store file contents and return the blob's ID.
    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId>;

    /// Store a tree. Entry names are validated before anything is written.
    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId>;

    /// Store a commit. Its tree and parents are not checked for presence.
    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId>;

    /// Look up an object that must be a blob.
    fn lookup_blob(&self, id: &ObjectId) -> StoreResult<Arc<Blob>> {
        match self.lookup(id)? {
            Object::Blob(blob) => Ok(blob),
            other => Err(kind_mismatch(id, ObjectKind::Blob, &other)),
        }
    }

    /// Look up an object that must be a tree.
    fn lookup_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>> {
        match self.lookup(id)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(kind_mismatch(id, ObjectKind::Tree, &other)),
        }
    }

    /// Look up an object that must be a commit.
    fn lookup_commit(&self, id: &ObjectId) -> StoreResult<Arc<Commit>> {
        match self.lookup(id)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(kind_mismatch(id, ObjectKind::Commit, &other)),
        }
    }
}

fn kind_mismatch(id: &ObjectId, expected: ObjectKind, found: &Object) -> StoreError {
    StoreError::KindMismatch {
        id: *id,
        expected,
        actual: found.kind(),
    }
}
