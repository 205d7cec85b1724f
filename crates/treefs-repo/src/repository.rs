use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use treefs_refs::{Head, InMemoryRefStore, Ref, RefError, RefStore, TagAnnotation};
use treefs_store::{Commit, InMemoryObjectStore, Object, ObjectStore, Signature, Tree, TreeEntry};
use treefs_types::ObjectId;

use crate::error::{RepoError, RepoResult};
use crate::git::GitBackend;
use crate::import;

/// Branch HEAD points at in a freshly initialized repository.
pub const DEFAULT_BRANCH: &str = "main";

/// A tree reached by peeling a reference, with the commit it came from.
#[derive(Clone, Debug)]
pub struct PeeledTree {
    pub tree_id: ObjectId,
    pub tree: Arc<Tree>,
    /// Present when the reference pointed at a commit.
    pub commit: Option<Arc<Commit>>,
}

impl PeeledTree {
    /// Committer time of the commit the tree was reached through.
    pub fn commit_time(&self) -> Option<DateTime<Utc>> {
        self.commit.as_ref().map(|c| c.committer.when)
    }
}

/// An object store plus its references.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl Repository {
    /// Bind existing stores.
    pub fn new(store: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self { store, refs }
    }

    /// Initialize an empty in-memory repository with HEAD on an unborn
    /// `main` branch.
    pub fn in_memory() -> RepoResult<Self> {
        let refs = InMemoryRefStore::new();
        refs.set_head(DEFAULT_BRANCH)?;
        Ok(Self::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(refs),
        ))
    }

    /// Open the Git repository at `path` (a work tree or a bare
    /// repository). Objects and references are read from and written to it.
    pub fn open_git(path: impl AsRef<Path>) -> RepoResult<Self> {
        let backend = Arc::new(GitBackend::open(path.as_ref())?);
        let store: Arc<dyn ObjectStore> = backend.clone();
        Ok(Self::new(store, backend))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    // ---- Content operations ----

    pub fn write_blob(&self, data: &[u8]) -> RepoResult<ObjectId> {
        Ok(self.store.write_blob(data)?)
    }

    /// Store a tree of `entries`, sorted by name.
    pub fn write_tree(&self, entries: Vec<TreeEntry>) -> RepoResult<ObjectId> {
        Ok(self.store.write_tree(&Tree::new(entries))?)
    }

    /// Import a directory from disk as a tree and return the root tree id.
    pub fn import_dir(&self, path: &Path) -> RepoResult<ObjectId> {
        import::import_dir(self, path)
    }

    // ---- Commit operations ----

    /// Write a commit of `tree` and, if `update_ref` is given, move that
    /// reference to it.
    ///
    /// `update_ref` accepts `"HEAD"` (updates the branch HEAD names, or HEAD
    /// itself when detached) or a full `refs/heads/...` name. The previous
    /// target of the updated reference becomes the commit's parent.
    pub fn commit(
        &self,
        update_ref: Option<&str>,
        author: &Signature,
        committer: &Signature,
        message: &str,
        tree: ObjectId,
    ) -> RepoResult<ObjectId> {
        self.store.lookup_tree(&tree)?;

        let target = match update_ref {
            Some(name) => Some(self.commit_target(name)?),
            None => None,
        };
        let parents = match &target {
            Some(CommitTarget::Branch { canonical, .. }) => self
                .refs
                .read_ref(canonical)?
                .map(|r| vec![r.target()])
                .unwrap_or_default(),
            Some(CommitTarget::DetachedHead(previous)) => vec![*previous],
            None => Vec::new(),
        };

        let commit = Commit {
            tree,
            parents,
            author: author.clone(),
            committer: committer.clone(),
            message: message.to_string(),
        };
        let id = self.store.write_commit(&commit)?;
        debug!(commit = %id.short_hex(), tree = %tree.short_hex(), "commit written");

        match target {
            Some(CommitTarget::Branch { canonical, short }) => {
                let branch = Ref::Branch {
                    name: short,
                    target: id,
                };
                self.refs.write_ref(&canonical, &branch)?;
            }
            Some(CommitTarget::DetachedHead(_)) => self.refs.set_head_detached(id)?,
            None => {}
        }
        Ok(id)
    }

    fn commit_target(&self, name: &str) -> RepoResult<CommitTarget> {
        if name == "HEAD" {
            return match self.refs.head()? {
                Some(Head::Symbolic(branch)) => Ok(CommitTarget::Branch {
                    canonical: format!("refs/heads/{branch}"),
                    short: branch,
                }),
                Some(Head::Detached(previous)) => Ok(CommitTarget::DetachedHead(previous)),
                None => Err(RefError::NotFound { name: name.into() }.into()),
            };
        }
        match name.strip_prefix("refs/heads/") {
            Some(short) => Ok(CommitTarget::Branch {
                canonical: name.to_string(),
                short: short.to_string(),
            }),
            None => Err(RefError::InvalidName {
                name: name.to_string(),
                reason: "commits can only update HEAD or a branch".into(),
            }
            .into()),
        }
    }

    /// Create an immutable tag pointing at `target`.
    pub fn create_tag(
        &self,
        name: &str,
        target: ObjectId,
        tagger: &Signature,
        message: &str,
    ) -> RepoResult<Ref> {
        self.store.lookup(&target)?;
        let tag = Ref::Tag {
            name: name.to_string(),
            target,
            annotation: Some(TagAnnotation {
                tagger_name: tagger.name.clone(),
                tagger_email: tagger.email.clone(),
                message: message.to_string(),
                timestamp: tagger.when,
            }),
        };
        self.refs.write_ref(&tag.canonical_name(), &tag)?;
        Ok(tag)
    }

    // ---- Reference operations ----

    /// Look up a reference by its full name (`HEAD` or `refs/...`).
    ///
    /// A missing reference, or HEAD on an unborn branch, is
    /// `RefError::NotFound`.
    pub fn lookup_reference(&self, name: &str) -> RepoResult<Ref> {
        if name == "HEAD" {
            return self.head();
        }
        self.refs
            .read_ref(name)?
            .ok_or_else(|| RefError::NotFound { name: name.into() }.into())
    }

    /// Look up a reference by full or short name, trying `refs/heads/` then
    /// `refs/tags/` for short names.
    pub fn find_reference(&self, shorthand: &str) -> RepoResult<Ref> {
        if shorthand == "HEAD" || shorthand.starts_with("refs/") {
            return self.lookup_reference(shorthand);
        }
        for prefix in ["refs/heads/", "refs/tags/"] {
            if let Some(found) = self.refs.read_ref(&format!("{prefix}{shorthand}"))? {
                return Ok(found);
            }
        }
        Err(RefError::NotFound {
            name: shorthand.into(),
        }
        .into())
    }

    /// The reference HEAD resolves to.
    pub fn head(&self) -> RepoResult<Ref> {
        match self.refs.head()? {
            Some(Head::Symbolic(branch)) => self.lookup_reference(&format!("refs/heads/{branch}")),
            Some(Head::Detached(target)) => Ok(Ref::Detached { target }),
            None => Err(RefError::NotFound {
                name: "HEAD".into(),
            }
            .into()),
        }
    }

    /// Follow `reference` (through a commit, if it points at one) to a tree.
    pub fn peel_to_tree(&self, reference: &Ref) -> RepoResult<PeeledTree> {
        let name = reference.canonical_name();
        let id = reference.target();
        let peeled = match self.store.lookup(&id)? {
            Object::Tree(tree) => PeeledTree {
                tree_id: id,
                tree,
                commit: None,
            },
            Object::Commit(commit) => PeeledTree {
                tree_id: commit.tree,
                tree: self.store.lookup_tree(&commit.tree)?,
                commit: Some(commit),
            },
            other => {
                return Err(RepoError::Peel {
                    name,
                    id,
                    kind: other.kind(),
                })
            }
        };
        debug!(reference = %name, tree = %peeled.tree_id.short_hex(), "reference peeled");
        Ok(peeled)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

enum CommitTarget {
    Branch { canonical: String, short: String },
    DetachedHead(ObjectId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use treefs_store::{EntryMode, ObjectKind, StoreError};

    fn signature() -> Signature {
        let when = Utc.with_ymd_and_hms(2013, 3, 6, 13, 30, 0).unwrap();
        Signature::new("Rand Om Hacker", "random@hacker.com", when)
    }

    fn seed(repo: &Repository) -> (ObjectId, ObjectId) {
        let blob = repo.write_blob(b"foo\n").unwrap();
        let tree = repo
            .write_tree(vec![TreeEntry::new(EntryMode::Regular, "README", blob)])
            .unwrap();
        let sig = signature();
        let commit = repo
            .commit(Some("HEAD"), &sig, &sig, "This is a commit\n", tree)
            .unwrap();
        (commit, tree)
    }

    #[test]
    fn commit_on_head_advances_branch() {
        let repo = Repository::in_memory().unwrap();
        let (commit, tree) = seed(&repo);

        let main = repo.lookup_reference("refs/heads/main").unwrap();
        assert_eq!(main.target(), commit);
        assert_eq!(repo.head().unwrap(), main);

        let stored = repo.store().lookup_commit(&commit).unwrap();
        assert_eq!(stored.tree, tree);
        assert!(stored.parents.is_empty());

        let sig = signature();
        let second = repo
            .commit(Some("HEAD"), &sig, &sig, "second", tree)
            .unwrap();
        let stored = repo.store().lookup_commit(&second).unwrap();
        assert_eq!(stored.parents, vec![commit]);
    }

    #[test]
    fn commit_without_ref_leaves_refs_alone() {
        let repo = Repository::in_memory().unwrap();
        let tree = repo.write_tree(vec![]).unwrap();
        let sig = signature();
        repo.commit(None, &sig, &sig, "floating", tree).unwrap();
        assert!(repo.refs().read_ref("refs/heads/main").unwrap().is_none());
    }

    #[test]
    fn commit_rejects_non_tree_and_non_branch_refs() {
        let repo = Repository::in_memory().unwrap();
        let blob = repo.write_blob(b"x").unwrap();
        let sig = signature();
        assert!(matches!(
            repo.commit(Some("HEAD"), &sig, &sig, "bad", blob),
            Err(RepoError::Store(StoreError::KindMismatch { .. }))
        ));
        let tree = repo.write_tree(vec![]).unwrap();
        assert!(repo
            .commit(Some("refs/tags/v1"), &sig, &sig, "bad", tree)
            .is_err());
    }

    #[test]
    fn commit_on_detached_head_moves_head() {
        let repo = Repository::in_memory().unwrap();
        let (first, tree) = seed(&repo);
        repo.refs().set_head_detached(first).unwrap();

        let sig = signature();
        let second = repo.commit(Some("HEAD"), &sig, &sig, "detached", tree).unwrap();
        assert_eq!(repo.head().unwrap(), Ref::Detached { target: second });
        assert_eq!(repo.lookup_reference("refs/heads/main").unwrap().target(), first);
    }

    #[test]
    fn unborn_head_is_not_found() {
        let repo = Repository::in_memory().unwrap();
        let err = repo.lookup_reference("HEAD").unwrap_err();
        assert!(matches!(err, RepoError::Ref(RefError::NotFound { name }) if name == "refs/heads/main"));
    }

    #[test]
    fn missing_reference_is_not_found() {
        let repo = Repository::in_memory().unwrap();
        assert!(matches!(
            repo.lookup_reference("refs/heads/nope"),
            Err(RepoError::Ref(RefError::NotFound { .. }))
        ));
        assert!(matches!(
            repo.find_reference("nope"),
            Err(RepoError::Ref(RefError::NotFound { .. }))
        ));
    }

    #[test]
    fn find_reference_accepts_short_names() {
        let repo = Repository::in_memory().unwrap();
        let (commit, tree) = seed(&repo);
        repo.create_tag("v1", tree, &signature(), "tree tag").unwrap();

        assert_eq!(repo.find_reference("main").unwrap().target(), commit);
        assert_eq!(repo.find_reference("v1").unwrap().target(), tree);
        assert_eq!(repo.find_reference("refs/tags/v1").unwrap().target(), tree);
        assert_eq!(repo.find_reference("HEAD").unwrap().target(), commit);
    }

    #[test]
    fn peel_through_commit() {
        let repo = Repository::in_memory().unwrap();
        let (_, tree) = seed(&repo);
        let peeled = repo.peel_to_tree(&repo.head().unwrap()).unwrap();
        assert_eq!(peeled.tree_id, tree);
        assert!(peeled.tree.get("README").is_some());
        assert_eq!(peeled.commit_time(), Some(signature().when));
    }

    #[test]
    fn peel_tag_on_tree() {
        let repo = Repository::in_memory().unwrap();
        let (_, tree) = seed(&repo);
        let tag = repo.create_tag("snapshot", tree, &signature(), "").unwrap();
        let peeled = repo.peel_to_tree(&tag).unwrap();
        assert_eq!(peeled.tree_id, tree);
        assert!(peeled.commit.is_none());
        assert!(peeled.commit_time().is_none());
    }

    #[test]
    fn peel_blob_fails() {
        let repo = Repository::in_memory().unwrap();
        let blob = repo.write_blob(b"not a tree").unwrap();
        let tag = repo.create_tag("blob", blob, &signature(), "").unwrap();
        let err = repo.peel_to_tree(&tag).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Peel { kind: ObjectKind::Blob, ref name, .. } if name == "refs/tags/blob"
        ));
    }

    #[test]
    fn tag_requires_existing_object() {
        let repo = Repository::in_memory().unwrap();
        let missing = ObjectId::from([0xee; 32]);
        assert!(matches!(
            repo.create_tag("v0", missing, &signature(), ""),
            Err(RepoError::Store(StoreError::NotFound(_)))
        ));
    }
}
