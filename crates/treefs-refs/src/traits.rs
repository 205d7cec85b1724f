//! The [`RefStore`] trait defining the reference storage interface.

use treefs_types::ObjectId;

use crate::error::Result;
use crate::types::{Head, Ref};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and provide atomic
/// read/write operations on named refs. The namespace follows a
/// hierarchical layout:
///
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Write (create or update) a ref at the given canonical name.
    ///
    /// `name` must equal `reference.canonical_name()`. Fails if a tag
    /// already exists at `name`.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Read the current HEAD state. `Ok(None)` if HEAD has not been set.
    fn head(&self) -> Result<Option<Head>>;

    /// Set HEAD to point at a branch (symbolic ref).
    fn set_head(&self, branch: &str) -> Result<()>;

    /// Set HEAD to a detached state pointing directly at an object.
    fn set_head_detached(&self, target: ObjectId) -> Result<()>;
}
