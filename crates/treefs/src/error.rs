use std::io;

use thiserror::Error;
use treefs_repo::RepoError;
use treefs_store::StoreError;

/// Errors from filesystem operations.
///
/// Store and repository failures are carried as-is so callers can inspect
/// the collaborator's own error.
#[derive(Debug, Error)]
pub enum FsError {
    /// A path segment does not exist in the tree.
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    /// `readdir` on a file.
    #[error("not a directory: {name}")]
    NotADirectory { name: String },

    /// `seek` on a directory.
    #[error("directories are not seekable")]
    NotSeekable,

    /// A raw seek origin outside 0 (start), 1 (current) and 2 (end).
    #[error("invalid whence: {0}")]
    InvalidWhence(i32),

    /// The seek would move the cursor before the start of the file.
    #[error("invalid seek offset: {0}")]
    InvalidOffset(i64),

    /// The handle was used after `close`.
    #[error("handle is closed")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl FsError {
    /// Returns `true` for a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NotFound { .. } => io::ErrorKind::NotFound,
            FsError::InvalidWhence(_) | FsError::InvalidOffset(_) => io::ErrorKind::InvalidInput,
            FsError::NotSeekable | FsError::NotADirectory { .. } => io::ErrorKind::Unsupported,
            FsError::Closed => io::ErrorKind::BrokenPipe,
            FsError::Store(_) | FsError::Repo(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub type FsResult<T> = Result<T, FsError>;
