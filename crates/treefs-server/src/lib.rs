//! HTTP static file server for treefs.
//!
//! Serves any [`FileSystem`](treefs::FileSystem) the way a plain static file
//! server serves a directory: files with a content type and
//! `Last-Modified`, directories through their index file or a generated
//! listing.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::TreeFsServer;
