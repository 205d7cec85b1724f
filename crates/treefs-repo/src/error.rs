use std::path::PathBuf;

use thiserror::Error;
use treefs_store::ObjectKind;
use treefs_types::ObjectId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("store error: {0}")]
    Store(#[from] treefs_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] treefs_refs::RefError),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// The reference does not lead to a tree.
    #[error("cannot peel {name} to a tree: {id} is a {kind}")]
    Peel {
        name: String,
        id: ObjectId,
        kind: ObjectKind,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

pub type RepoResult<T> = Result<T, RepoError>;
