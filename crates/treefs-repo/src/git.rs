//! Git repositories as object and reference stores, through libgit2.
//!
//! Git objects are converted into owned treefs objects while the repository
//! lock is held, so nothing borrowed from libgit2 escapes a call. Annotated
//! tag objects are peeled to the object they tag; submodule entries
//! (gitlinks) are left out of trees since their commits live elsewhere.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use git2::{ErrorCode, ObjectType, Oid, ReferenceType};
use treefs_refs::{
    validate_branch_name, validate_ref_write, Head, Ref, RefError, RefStore, TagAnnotation,
};
use treefs_store::{
    Blob, Commit, EntryMode, Object, ObjectStore, Signature, StoreError, StoreResult, Tree,
    TreeEntry,
};
use treefs_types::ObjectId;

/// Mode of a submodule entry.
const GITLINK_MODE: u32 = 0o160000;
/// Legacy group-writable blob mode, still found in old histories.
const GROUP_WRITABLE_MODE: u32 = 0o100664;

/// A Git repository on disk, shared behind a lock.
pub struct GitBackend {
    repo: Mutex<git2::Repository>,
    path: PathBuf,
}

impl GitBackend {
    /// Open the repository at `path`, bare or with a work tree.
    pub fn open(path: &Path) -> Result<Self, git2::Error> {
        let repo = git2::Repository::open(path)?;
        tracing::debug!(path = %path.display(), bare = repo.is_bare(), "git repository opened");
        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, git2::Repository>, String> {
        self.repo.lock().map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBackend").field("path", &self.path).finish()
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn backend(e: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::Backend(Box::new(e))
}

fn corrupt(id: &ObjectId, reason: impl Into<String>) -> StoreError {
    StoreError::CorruptObject {
        id: *id,
        reason: reason.into(),
    }
}

/// Errors naming a missing object become `NotFound` for `id`.
fn missing_or_backend(id: &ObjectId, e: git2::Error) -> StoreError {
    if e.code() == ErrorCode::NotFound {
        StoreError::NotFound(*id)
    } else {
        backend(e)
    }
}

/// The Git object id for `id`. Ids that are not SHA-1 digests cannot name
/// anything in a Git repository.
fn git_oid(id: &ObjectId) -> StoreResult<Oid> {
    Oid::from_bytes(id.as_bytes()).map_err(|_| StoreError::NotFound(*id))
}

fn object_id(oid: Oid) -> StoreResult<ObjectId> {
    ObjectId::from_digest(oid.as_bytes()).map_err(backend)
}

fn git_signature(sig: &Signature) -> Result<git2::Signature<'static>, git2::Error> {
    git2::Signature::new(&sig.name, &sig.email, &git2::Time::new(sig.when.timestamp(), 0))
}

fn timestamp(time: git2::Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.seconds(), 0)
}

fn signature(id: &ObjectId, sig: &git2::Signature<'_>) -> StoreResult<Signature> {
    let when = timestamp(sig.when()).ok_or_else(|| corrupt(id, "signature time out of range"))?;
    Ok(Signature::new(
        String::from_utf8_lossy(sig.name_bytes()),
        String::from_utf8_lossy(sig.email_bytes()),
        when,
    ))
}

fn convert_tree(id: &ObjectId, tree: &git2::Tree<'_>) -> StoreResult<Tree> {
    let mut entries = Vec::with_capacity(tree.len());
    for entry in tree.iter() {
        let bits = u32::try_from(entry.filemode()).unwrap_or(0);
        let mode = match EntryMode::from_mode_bits(bits) {
            Some(mode) => mode,
            None if bits == GROUP_WRITABLE_MODE => EntryMode::Regular,
            None if bits == GITLINK_MODE => continue,
            None => return Err(corrupt(id, format!("unsupported file mode {bits:06o}"))),
        };
        let name = entry
            .name()
            .ok_or_else(|| corrupt(id, "entry name is not valid UTF-8"))?;
        entries.push(TreeEntry::new(mode, name, object_id(entry.id())?));
    }
    Ok(Tree::new(entries))
}

fn convert_commit(id: &ObjectId, commit: &git2::Commit<'_>) -> StoreResult<Commit> {
    Ok(Commit {
        tree: object_id(commit.tree_id())?,
        parents: commit
            .parent_ids()
            .map(object_id)
            .collect::<StoreResult<_>>()?,
        author: signature(id, &commit.author())?,
        committer: signature(id, &commit.committer())?,
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
    })
}

impl ObjectStore for GitBackend {
    fn lookup(&self, id: &ObjectId) -> StoreResult<Object> {
        let oid = git_oid(id)?;
        let repo = self.lock().map_err(StoreError::Poisoned)?;
        let mut object = repo
            .find_object(oid, None)
            .map_err(|e| missing_or_backend(id, e))?;
        if object.kind() == Some(ObjectType::Tag) {
            object = object.peel(ObjectType::Any).map_err(backend)?;
        }

        if let Some(blob) = object.as_blob() {
            return Ok(Object::Blob(Arc::new(Blob::new(blob.content().to_vec()))));
        }
        if let Some(tree) = object.as_tree() {
            return Ok(Object::Tree(Arc::new(convert_tree(id, tree)?)));
        }
        if let Some(commit) = object.as_commit() {
            return Ok(Object::Commit(Arc::new(convert_commit(id, commit)?)));
        }
        Err(corrupt(id, "unsupported git object type"))
    }

    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let repo = self.lock().map_err(StoreError::Poisoned)?;
        let id = object_id(repo.blob(data).map_err(backend)?)?;
        tracing::trace!(id = %id.short_hex(), kind = "blob", size = data.len(), "object stored");
        Ok(id)
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        tree.validate()?;
        let repo = self.lock().map_err(StoreError::Poisoned)?;
        let mut builder = repo.treebuilder(None).map_err(backend)?;
        for entry in tree.iter() {
            let oid = git_oid(&entry.object_id)?;
            builder
                .insert(entry.name.as_str(), oid, entry.mode.mode_bits() as i32)
                .map_err(|e| missing_or_backend(&entry.object_id, e))?;
        }
        let id = object_id(builder.write().map_err(backend)?)?;
        tracing::trace!(id = %id.short_hex(), kind = "tree", entries = tree.len(), "object stored");
        Ok(id)
    }

    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        let repo = self.lock().map_err(StoreError::Poisoned)?;
        let tree = repo
            .find_tree(git_oid(&commit.tree)?)
            .map_err(|e| missing_or_backend(&commit.tree, e))?;
        let mut parents = Vec::with_capacity(commit.parents.len());
        for parent in &commit.parents {
            let found = repo
                .find_commit(git_oid(parent)?)
                .map_err(|e| missing_or_backend(parent, e))?;
            parents.push(found);
        }
        let parents: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let author = git_signature(&commit.author).map_err(backend)?;
        let committer = git_signature(&commit.committer).map_err(backend)?;
        let oid = repo
            .commit(None, &author, &committer, &commit.message, &tree, &parents)
            .map_err(backend)?;
        let id = object_id(oid)?;
        tracing::trace!(id = %id.short_hex(), kind = "commit", "object stored");
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

fn ref_backend(e: impl std::error::Error + Send + Sync + 'static) -> RefError {
    RefError::Backend(Box::new(e))
}

fn ref_oid(id: &ObjectId) -> Result<Oid, RefError> {
    Oid::from_bytes(id.as_bytes()).map_err(ref_backend)
}

fn ref_object_id(oid: Oid) -> Result<ObjectId, RefError> {
    ObjectId::from_digest(oid.as_bytes()).map_err(ref_backend)
}

fn invalid_name(name: &str, reason: &str) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Target and annotation of the tag whose ref points at `oid`. Lightweight
/// tags point straight at the tagged object; a tag object without a tagger
/// reads as lightweight.
fn read_tag(
    repo: &git2::Repository,
    oid: Oid,
) -> Result<(ObjectId, Option<TagAnnotation>), RefError> {
    let object = repo.find_object(oid, None).map_err(ref_backend)?;
    let tag = match object.into_tag() {
        Ok(tag) => tag,
        Err(_) => return Ok((ref_object_id(oid)?, None)),
    };
    let annotation = tag.tagger().and_then(|tagger| {
        Some(TagAnnotation {
            tagger_name: String::from_utf8_lossy(tagger.name_bytes()).into_owned(),
            tagger_email: String::from_utf8_lossy(tagger.email_bytes()).into_owned(),
            message: String::from_utf8_lossy(tag.message_bytes().unwrap_or_default())
                .into_owned(),
            timestamp: timestamp(tagger.when())?,
        })
    });
    Ok((ref_object_id(tag.target_id())?, annotation))
}

impl RefStore for GitBackend {
    fn read_ref(&self, name: &str) -> treefs_refs::Result<Option<Ref>> {
        let repo = self.lock().map_err(RefError::Poisoned)?;
        let reference = match repo.find_reference(name) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) if e.code() == ErrorCode::InvalidSpec => {
                return Err(invalid_name(name, "not a valid reference name"))
            }
            Err(e) => return Err(ref_backend(e)),
        };
        let oid = reference
            .resolve()
            .map_err(ref_backend)?
            .target()
            .ok_or_else(|| invalid_name(name, "reference has no target"))?;

        if let Some(short) = name.strip_prefix("refs/heads/") {
            return Ok(Some(Ref::Branch {
                name: short.to_string(),
                target: ref_object_id(oid)?,
            }));
        }
        if let Some(short) = name.strip_prefix("refs/tags/") {
            let (target, annotation) = read_tag(&repo, oid)?;
            return Ok(Some(Ref::Tag {
                name: short.to_string(),
                target,
                annotation,
            }));
        }
        Err(invalid_name(name, "only refs/heads/ and refs/tags/ can be read"))
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> treefs_refs::Result<()> {
        validate_ref_write(name, reference)?;
        let repo = self.lock().map_err(RefError::Poisoned)?;
        let oid = ref_oid(&reference.target())?;

        match reference {
            Ref::Tag {
                name: short,
                annotation,
                ..
            } => {
                if repo.find_reference(name).is_ok() {
                    return Err(RefError::TagImmutable {
                        name: name.to_string(),
                    });
                }
                match annotation {
                    Some(annotation) => {
                        let object = repo.find_object(oid, None).map_err(ref_backend)?;
                        let tagger = git2::Signature::new(
                            &annotation.tagger_name,
                            &annotation.tagger_email,
                            &git2::Time::new(annotation.timestamp.timestamp(), 0),
                        )
                        .map_err(ref_backend)?;
                        repo.tag(short, &object, &tagger, &annotation.message, false)
                            .map_err(ref_backend)?;
                    }
                    None => {
                        repo.reference(name, oid, false, "treefs: create tag")
                            .map_err(ref_backend)?;
                    }
                }
            }
            _ => {
                repo.reference(name, oid, true, "treefs: update branch")
                    .map_err(ref_backend)?;
            }
        }
        tracing::debug!(refname = name, object = %reference.target().short_hex(), "ref updated");
        Ok(())
    }

    fn head(&self) -> treefs_refs::Result<Option<Head>> {
        let repo = self.lock().map_err(RefError::Poisoned)?;
        let head = match repo.find_reference("HEAD") {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(ref_backend(e)),
        };
        match head.kind() {
            Some(ReferenceType::Symbolic) => {
                let target = head
                    .symbolic_target()
                    .ok_or_else(|| invalid_name("HEAD", "symbolic target is not valid UTF-8"))?;
                let branch = target
                    .strip_prefix("refs/heads/")
                    .ok_or_else(|| invalid_name(target, "HEAD must name a branch"))?;
                Ok(Some(Head::Symbolic(branch.to_string())))
            }
            _ => {
                let oid = head
                    .target()
                    .ok_or_else(|| invalid_name("HEAD", "reference has no target"))?;
                Ok(Some(Head::Detached(ref_object_id(oid)?)))
            }
        }
    }

    fn set_head(&self, branch: &str) -> treefs_refs::Result<()> {
        validate_branch_name(branch)?;
        let repo = self.lock().map_err(RefError::Poisoned)?;
        repo.set_head(&format!("refs/heads/{branch}"))
            .map_err(ref_backend)
    }

    /// libgit2 only detaches HEAD onto commits.
    fn set_head_detached(&self, target: ObjectId) -> treefs_refs::Result<()> {
        let repo = self.lock().map_err(RefError::Poisoned)?;
        repo.set_head_detached(ref_oid(&target)?)
            .map_err(ref_backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RepoError, Repository};
    use chrono::TimeZone;
    use treefs_store::ObjectKind;

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 3, 6, 13, 30, 0).unwrap()
    }

    /// A bare repository holding one commit on HEAD with `README` = "foo\n",
    /// written with libgit2 directly.
    fn seed_repo() -> (tempfile::TempDir, Oid, Oid) {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init_bare(dir.path()).unwrap();
        // 14:30 in Berlin.
        let sig = git2::Signature::new(
            "Rand Om Hacker",
            "random@hacker.com",
            &git2::Time::new(when().timestamp(), 60),
        )
        .unwrap();

        let blob = repo.blob(b"foo\n").unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("README", blob, 0o100644).unwrap();
        let tree_id = builder.write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let commit = repo
            .commit(Some("HEAD"), &sig, &sig, "This is a commit\n", &tree, &[])
            .unwrap();
        (dir, commit, tree_id)
    }

    fn id(oid: Oid) -> ObjectId {
        ObjectId::from_digest(oid.as_bytes()).unwrap()
    }

    #[test]
    fn reads_objects_written_by_git() {
        let (dir, commit, tree) = seed_repo();
        let backend = GitBackend::open(dir.path()).unwrap();

        let stored = backend.lookup_commit(&id(commit)).unwrap();
        assert_eq!(stored.tree, id(tree));
        assert!(stored.parents.is_empty());
        assert_eq!(stored.message, "This is a commit\n");
        assert_eq!(stored.committer.when, when());
        assert_eq!(stored.author.name, "Rand Om Hacker");

        let root = backend.lookup_tree(&id(tree)).unwrap();
        let readme = root.get("README").unwrap();
        assert_eq!(readme.mode, EntryMode::Regular);
        let blob = backend.lookup_blob(&readme.object_id).unwrap();
        assert_eq!(blob.contents(), b"foo\n");
    }

    #[test]
    fn missing_and_foreign_ids_are_not_found() {
        let (dir, _, tree) = seed_repo();
        let backend = GitBackend::open(dir.path()).unwrap();

        let absent = ObjectId::from([0x5a; 20]);
        assert!(matches!(backend.lookup(&absent), Err(StoreError::NotFound(m)) if m == absent));
        let blake = ObjectId::from([0x5a; 32]);
        assert!(matches!(backend.lookup(&blake), Err(StoreError::NotFound(_))));

        assert!(matches!(
            backend.lookup_blob(&id(tree)),
            Err(StoreError::KindMismatch {
                expected: ObjectKind::Blob,
                actual: ObjectKind::Tree,
                ..
            })
        ));
    }

    #[test]
    fn reads_head_and_branches() {
        let (dir, commit, _) = seed_repo();
        let backend = GitBackend::open(dir.path()).unwrap();

        let Some(Head::Symbolic(branch)) = backend.head().unwrap() else {
            panic!("HEAD should name a branch");
        };
        let canonical = format!("refs/heads/{branch}");
        let read = backend.read_ref(&canonical).unwrap().unwrap();
        assert_eq!(read, Ref::Branch { name: branch, target: id(commit) });
        assert!(backend.read_ref("refs/heads/nope").unwrap().is_none());
    }

    #[test]
    fn repository_peels_git_head_to_tree() {
        let (dir, commit, tree) = seed_repo();
        let repo = Repository::open_git(dir.path()).unwrap();

        let head = repo.lookup_reference("HEAD").unwrap();
        assert_eq!(head.target(), id(commit));
        let peeled = repo.peel_to_tree(&head).unwrap();
        assert_eq!(peeled.tree_id, id(tree));
        assert_eq!(peeled.commit_time(), Some(when()));
    }

    #[test]
    fn annotated_and_lightweight_tags() {
        let (dir, commit, tree) = seed_repo();
        let repo = Repository::open_git(dir.path()).unwrap();
        let sig = Signature::new("Tagger", "tagger@example.com", when());

        repo.create_tag("v1", id(commit), &sig, "release\n").unwrap();
        let tag = repo.find_reference("v1").unwrap();
        assert_eq!(tag.target(), id(commit));
        let Ref::Tag { annotation: Some(annotation), .. } = &tag else {
            panic!("expected an annotated tag, got {tag:?}");
        };
        assert_eq!(annotation.tagger_name, "Tagger");
        assert_eq!(annotation.message, "release\n");
        assert_eq!(annotation.timestamp, when());

        let light = Ref::Tag {
            name: "snapshot".into(),
            target: id(tree),
            annotation: None,
        };
        repo.refs().write_ref("refs/tags/snapshot", &light).unwrap();
        assert_eq!(repo.lookup_reference("refs/tags/snapshot").unwrap(), light);
        assert!(repo.peel_to_tree(&light).unwrap().commit.is_none());

        assert!(matches!(
            repo.refs().write_ref("refs/tags/snapshot", &light),
            Err(RefError::TagImmutable { .. })
        ));
        assert!(matches!(
            repo.refs().write_ref("refs/tags/other", &light),
            Err(RefError::InvalidName { .. })
        ));
    }

    #[test]
    fn commits_through_repository_land_in_git() {
        let (dir, first, tree) = seed_repo();
        let repo = Repository::open_git(dir.path()).unwrap();

        let blob = repo.write_blob(b"bar\n").unwrap();
        assert_eq!(blob.to_hex(), "5716ca5987cbf97d6bb54920bea6adde242d87e6");
        let next_tree = repo
            .write_tree(vec![
                TreeEntry::new(EntryMode::Regular, "README", blob),
                TreeEntry::new(EntryMode::Directory, "old", id(tree)),
            ])
            .unwrap();
        let sig = Signature::new("Rand Om Hacker", "random@hacker.com", when());
        let second = repo
            .commit(Some("HEAD"), &sig, &sig, "second\n", next_tree)
            .unwrap();

        let git = git2::Repository::open(dir.path()).unwrap();
        let head = git.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(id(head.id()), second);
        assert_eq!(id(head.parent_id(0).unwrap()), id(first));
        assert!(head.tree().unwrap().get_path(Path::new("old/README")).is_ok());
    }

    #[test]
    fn gitlinks_are_left_out() {
        let (dir, commit, _) = seed_repo();
        let git = git2::Repository::open(dir.path()).unwrap();
        let mut builder = git.treebuilder(None).unwrap();
        builder.insert("module", commit, 0o160000).unwrap();
        builder
            .insert("README", git.blob(b"x").unwrap(), 0o100644)
            .unwrap();
        let tree = builder.write().unwrap();

        let backend = GitBackend::open(dir.path()).unwrap();
        let tree = backend.lookup_tree(&id(tree)).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.get("module").is_none());
    }

    #[test]
    fn open_rejects_plain_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::open_git(dir.path()),
            Err(RepoError::Git(_))
        ));
    }
}
