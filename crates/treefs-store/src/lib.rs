//! Content-addressed object storage for treefs.
//!
//! This crate defines the object model treefs reads (blobs, trees and
//! commits) and the [`ObjectStore`] trait that hands decoded objects out by
//! id. Objects are immutable once written.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- a root tree plus authorship and history
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - `treefs_repo::GitBackend` -- a Git repository on disk, through `git2`
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe (objects are immutable).
//! 3. Decoded objects are handed out behind `Arc`; dropping the last clone
//!    releases them.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, Object, ObjectKind, Signature, Tree, TreeEntry};
pub use traits::ObjectStore;
