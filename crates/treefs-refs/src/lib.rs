//! Reference management for treefs.
//!
//! Named references (branches, tags, HEAD) point at objects in the store.
//! They are the human-readable entry points a filesystem root is bound
//! through, analogous to git refs.
//!
//! # Architecture
//!
//! - **Branches** are mutable pointers, normally at commits. They advance as
//!   new commits are made.
//! - **Tags** are immutable pointers to any object. Once created, a tag
//!   cannot be moved.
//! - **HEAD** is either symbolic (names the current branch) or detached
//!   (points directly at an object).
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: Core ref types: [`Ref`], [`TagAnnotation`], [`Head`]
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Branch/tag name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`]

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, validate_ref_write, validate_tag_name};
pub use traits::RefStore;
pub use types::{Head, Ref, TagAnnotation};
