use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use treefs_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, Object, ObjectKind, Tree};
use crate::traits::ObjectStore;

/// In-memory object store keyed by domain-separated BLAKE3 ids.
///
/// Trees and commits are hashed over their JSON encoding, blobs over their
/// raw bytes, each prefixed with a per-kind domain tag so the same bytes
/// stored as two kinds get two ids. Objects are kept decoded behind `Arc`,
/// so a lookup hands out another reference rather than a copy.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Object>>,
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

fn domain(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Blob => "treefs-blob-v1",
        ObjectKind::Tree => "treefs-tree-v1",
        ObjectKind::Commit => "treefs-commit-v1",
    }
}

fn object_id(kind: ObjectKind, encoded: &[u8]) -> ObjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain(kind).as_bytes());
    hasher.update(b":");
    hasher.update(encoded);
    ObjectId::from(*hasher.finalize().as_bytes())
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn insert(
        &self,
        kind: ObjectKind,
        encoded: &[u8],
        decoded: impl FnOnce() -> Object,
    ) -> StoreResult<ObjectId> {
        let id = object_id(kind, encoded);
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.entry(id).or_insert_with(|| {
            tracing::trace!(id = %id.short_hex(), %kind, size = encoded.len(), "object stored");
            decoded()
        });
        Ok(id)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn lookup(&self, id: &ObjectId) -> StoreResult<Object> {
        let objects = self.objects.read().map_err(poisoned)?;
        objects.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.insert(ObjectKind::Blob, data, || {
            Object::Blob(Arc::new(Blob::new(data.to_vec())))
        })
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        tree.validate()?;
        let encoded = encode(tree)?;
        self.insert(ObjectKind::Tree, &encoded, || {
            Object::Tree(Arc::new(tree.clone()))
        })
    }

    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        let encoded = encode(commit)?;
        self.insert(ObjectKind::Commit, &encoded, || {
            Object::Commit(Arc::new(commit.clone()))
        })
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;
    use chrono::{TimeZone, Utc};
    use std::thread;

    #[test]
    fn write_and_lookup_blob() {
        let store = InMemoryObjectStore::new();
        let id = store.write_blob(b"foo\n").unwrap();
        assert_eq!(id.as_bytes().len(), 32);

        let blob = store.lookup_blob(&id).unwrap();
        assert_eq!(blob.contents(), b"foo\n");
        assert_eq!(blob.size(), 4);
    }

    #[test]
    fn write_and_lookup_tree() {
        let store = InMemoryObjectStore::new();
        let blob_id = store.write_blob(b"hello").unwrap();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "hello.txt", blob_id)]);
        let id = store.write_tree(&tree).unwrap();

        let read_back = store.lookup_tree(&id).unwrap();
        assert_eq!(*read_back, tree);
        assert!(read_back.get("hello.txt").is_some());
    }

    #[test]
    fn write_tree_validates_names_first() {
        let store = InMemoryObjectStore::new();
        let tree = Tree::new(vec![TreeEntry::new(
            EntryMode::Regular,
            "a/b",
            ObjectId::from([1u8; 32]),
        )]);
        assert!(matches!(
            store.write_tree(&tree),
            Err(StoreError::InvalidEntryName { .. })
        ));
        assert!(store.objects.read().unwrap().is_empty());
    }

    #[test]
    fn write_and_lookup_commit() {
        let store = InMemoryObjectStore::new();
        let tree = store.write_tree(&Tree::empty()).unwrap();
        let when = Utc.with_ymd_and_hms(2013, 3, 6, 13, 30, 0).unwrap();
        let sig = Signature::new("Rand Om Hacker", "random@hacker.com", when);
        let commit = Commit {
            tree,
            parents: vec![],
            author: sig.clone(),
            committer: sig,
            message: "This is a commit".into(),
        };
        let id = store.write_commit(&commit).unwrap();
        assert_eq!(*store.lookup_commit(&id).unwrap(), commit);
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from([9u8; 32]);
        assert!(matches!(store.lookup(&id), Err(StoreError::NotFound(m)) if m == id));
    }

    #[test]
    fn typed_lookup_rejects_wrong_kind() {
        let store = InMemoryObjectStore::new();
        let id = store.write_blob(b"just bytes").unwrap();
        let err = store.lookup_tree(&id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::KindMismatch {
                expected: ObjectKind::Tree,
                actual: ObjectKind::Blob,
                ..
            }
        ));
        assert!(store.lookup_commit(&id).is_err());
    }

    #[test]
    fn same_content_is_deduplicated() {
        let store = InMemoryObjectStore::new();
        let id1 = store.write_blob(b"identical").unwrap();
        let id2 = store.write_blob(b"identical").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.objects.read().unwrap().len(), 1);
    }

    #[test]
    fn kinds_are_domain_separated() {
        let encoded = encode(&Tree::empty()).unwrap();
        let store = InMemoryObjectStore::new();
        let as_blob = store.write_blob(&encoded).unwrap();
        let as_tree = store.write_tree(&Tree::empty()).unwrap();
        assert_ne!(as_blob, as_tree);
        assert_eq!(store.lookup(&as_tree).unwrap().kind(), ObjectKind::Tree);
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write_blob(b"before").unwrap();

        let writer = Arc::clone(&store);
        let result = thread::spawn(move || {
            let _guard = writer.objects.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());

        assert!(matches!(store.lookup(&id), Err(StoreError::Poisoned(_))));
        assert!(matches!(
            store.write_blob(b"after"),
            Err(StoreError::Poisoned(_))
        ));
    }

    #[test]
    fn concurrent_reads_are_safe() {
        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write_blob(b"shared data").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let blob = store.lookup_blob(&id).unwrap();
                    assert_eq!(blob.contents(), b"shared data");
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
