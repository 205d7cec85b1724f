use std::path::PathBuf;

use thiserror::Error;
use treefs::FsError;
use treefs_repo::RepoError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("configuration error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns `true` when the request named something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServerError::Fs(err) if err.is_not_found())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
