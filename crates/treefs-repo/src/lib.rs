//! Repository API for treefs.
//!
//! A [`Repository`] binds an object store to a ref store and provides the
//! operations needed to seed content (blobs, trees, commits, tags, directory
//! import) and to find a tree to serve (reference lookup and peeling).
//!
//! Repositories live either in memory ([`Repository::in_memory`]) or in a
//! Git repository on disk ([`Repository::open_git`], backed by
//! [`GitBackend`]).

pub mod error;
pub mod git;
pub mod import;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use git::GitBackend;
pub use repository::{PeeledTree, Repository};

pub use treefs_refs::{Head, Ref, TagAnnotation};
pub use treefs_store::{Blob, Commit, EntryMode, ObjectStore, Signature, Tree, TreeEntry};
pub use treefs_types::ObjectId;
