//! Core reference types.
//!
//! References are named pointers at objects. Branches normally point at
//! commits; tags may point at any object, including a bare tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treefs_types::ObjectId;

/// A named reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    /// A branch is a mutable pointer, normally at the tip commit.
    Branch {
        /// Human-readable branch name (e.g. "main", "feature/auth").
        name: String,
        /// The object the branch points at.
        target: ObjectId,
    },

    /// A tag is an immutable pointer to a specific object.
    Tag {
        /// Tag name (e.g. "v1.0.0").
        name: String,
        /// The tagged object.
        target: ObjectId,
        /// Present for annotated tags, absent for lightweight ones.
        annotation: Option<TagAnnotation>,
    },

    /// A detached HEAD seen as a reference. Never stored under `refs/`.
    Detached {
        /// The object HEAD points at.
        target: ObjectId,
    },
}

impl Ref {
    /// Returns the canonical name for this ref (e.g. "refs/heads/main").
    pub fn canonical_name(&self) -> String {
        match self {
            Ref::Branch { name, .. } => format!("refs/heads/{name}"),
            Ref::Tag { name, .. } => format!("refs/tags/{name}"),
            Ref::Detached { .. } => "HEAD".to_string(),
        }
    }

    /// Returns the short name of this ref (without the refs/ prefix).
    pub fn short_name(&self) -> &str {
        match self {
            Ref::Branch { name, .. } | Ref::Tag { name, .. } => name,
            Ref::Detached { .. } => "HEAD",
        }
    }

    /// Returns `true` if this is a branch ref.
    pub fn is_branch(&self) -> bool {
        matches!(self, Ref::Branch { .. })
    }

    /// Returns `true` if this is a tag ref.
    pub fn is_tag(&self) -> bool {
        matches!(self, Ref::Tag { .. })
    }

    /// Returns the object this ref points to.
    pub fn target(&self) -> ObjectId {
        match self {
            Ref::Branch { target, .. } | Ref::Tag { target, .. } | Ref::Detached { target } => {
                *target
            }
        }
    }
}

/// Who tagged an object, when and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAnnotation {
    pub tagger_name: String,
    pub tagger_email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// HEAD points to a branch by short name.
    Symbolic(String),
    /// HEAD is detached, pointing directly at an object.
    Detached(ObjectId),
}
