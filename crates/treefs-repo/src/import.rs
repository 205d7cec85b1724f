//! Building trees from a directory on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use treefs_store::{EntryMode, TreeEntry};
use treefs_types::ObjectId;
use walkdir::WalkDir;

use crate::error::{RepoError, RepoResult};
use crate::repository::Repository;

/// Walk `root` and store every file, symlink and directory below it.
///
/// Directories are visited after their contents, so each subtree is written
/// before the entry pointing at it. Symlinks are stored as blobs holding the
/// link target and are never followed.
pub(crate) fn import_dir(repo: &Repository, root: &Path) -> RepoResult<ObjectId> {
    let meta = fs::metadata(root).map_err(|source| RepoError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(RepoError::NotADirectory(root.to_path_buf()));
    }

    let mut pending: HashMap<PathBuf, Vec<TreeEntry>> = HashMap::new();
    let mut blobs = 0usize;

    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type();

        let (mode, id) = if file_type.is_dir() {
            let children = pending.remove(path).unwrap_or_default();
            (EntryMode::Directory, repo.write_tree(children)?)
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|source| io_error(path, source))?;
            let target = target
                .to_str()
                .ok_or_else(|| RepoError::NonUtf8Path(target.clone()))?;
            blobs += 1;
            (EntryMode::Symlink, repo.write_blob(target.as_bytes())?)
        } else {
            let data = fs::read(path).map_err(|source| io_error(path, source))?;
            let meta = entry.metadata()?;
            let mode = if is_executable(&meta) {
                EntryMode::Executable
            } else {
                EntryMode::Regular
            };
            blobs += 1;
            (mode, repo.write_blob(&data)?)
        };

        if entry.depth() == 0 {
            debug!(root = %root.display(), tree = %id.short_hex(), blobs, "directory imported");
            return Ok(id);
        }

        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| RepoError::NonUtf8Path(path.to_path_buf()))?;
        let parent = path
            .parent()
            .ok_or_else(|| RepoError::NotADirectory(path.to_path_buf()))?;
        pending
            .entry(parent.to_path_buf())
            .or_default()
            .push(TreeEntry::new(mode, name, id));
    }

    // WalkDir always yields the root last with contents_first; an empty walk
    // means the root vanished underneath us.
    Err(RepoError::NotADirectory(root.to_path_buf()))
}

fn io_error(path: &Path, source: std::io::Error) -> RepoError {
    RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}
