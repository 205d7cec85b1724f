//! Path resolution against a root tree.

use std::sync::Arc;

use treefs_store::{EntryMode, Object, ObjectKind, ObjectStore, Tree, TreeEntry};

use crate::error::{FsError, FsResult};

/// Where a resolved path sits in the tree.
///
/// The root has no entry of its own in any tree, so it is its own case
/// rather than a fabricated entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Root,
    Entry(TreeEntry),
}

impl Node {
    /// Entry name; empty for the root.
    pub fn name(&self) -> &str {
        match self {
            Node::Root => "",
            Node::Entry(entry) => &entry.name,
        }
    }

    pub fn mode(&self) -> EntryMode {
        match self {
            Node::Root => EntryMode::Directory,
            Node::Entry(entry) => entry.mode,
        }
    }
}

/// A path resolved to its node and loaded object.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub node: Node,
    /// Always a blob or a tree, matching `node.mode()`.
    pub object: Object,
}

/// Strip leading slashes. An empty result names the root.
pub fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Resolve `path` against `root`.
///
/// A missing segment, a file used as a directory, or a trailing slash after
/// a file yields [`FsError::NotFound`]. Store failures (including an object
/// whose kind disagrees with its entry mode) are returned unchanged.
pub fn resolve(store: &dyn ObjectStore, root: &Arc<Tree>, path: &str) -> FsResult<Resolved> {
    let relative = normalize(path);
    if relative.is_empty() {
        return Ok(Resolved {
            node: Node::Root,
            object: Object::Tree(Arc::clone(root)),
        });
    }

    let not_found = || FsError::NotFound {
        path: path.to_string(),
    };
    let entry = root.entry_by_path(store, relative)?.ok_or_else(not_found)?;
    if relative.ends_with('/') && !entry.is_tree() {
        return Err(not_found());
    }

    let object = load(store, &entry)?;
    Ok(Resolved {
        node: Node::Entry(entry),
        object,
    })
}

/// Load the object an entry points at, checking it has the kind the entry
/// mode promises.
pub(crate) fn load(store: &dyn ObjectStore, entry: &TreeEntry) -> FsResult<Object> {
    Ok(match entry.mode.object_kind() {
        ObjectKind::Tree => Object::Tree(store.lookup_tree(&entry.object_id)?),
        _ => Object::Blob(store.lookup_blob(&entry.object_id)?),
    })
}
