//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The branch or tag name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A tag is immutable and cannot be updated.
    #[error("tag is immutable: {name}")]
    TagImmutable { name: String },


    /// A lock guarding the ref table was poisoned by a panicking writer.
    #[error("ref store lock poisoned: {0}")]
    Poisoned(String),

    /// The backing repository failed.
    #[error("ref backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
