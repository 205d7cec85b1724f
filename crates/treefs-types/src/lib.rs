//! Foundation types for treefs.
//!
//! Every other treefs crate depends on `treefs-types` for the identifier
//! that names objects in the content-addressed store.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 or Git SHA-1 digest)
//! - [`TypeError`]: Parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
