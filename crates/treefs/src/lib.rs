//! Read-only virtual filesystem over a content-addressed tree.
//!
//! [`TreeFs`] binds one root [`Tree`](treefs_store::Tree) and answers
//! [`FileSystem::open`] with a [`Handle`]: a [`FileHandle`] for blobs or a
//! [`DirHandle`] for subtrees. Both speak the same [`VfsFile`] contract
//! (read, seek, readdir, stat, close), so a consumer such as a static file
//! server never needs to know it is looking at versioned objects.
//!
//! ```
//! use treefs::{FileSystem, TreeFs, VfsFile};
//! use treefs_repo::{EntryMode, Repository, Signature, TreeEntry};
//!
//! let repo = Repository::in_memory().unwrap();
//! let blob = repo.write_blob(b"foo\n").unwrap();
//! let tree = repo
//!     .write_tree(vec![TreeEntry::new(EntryMode::Regular, "README", blob)])
//!     .unwrap();
//! let sig = Signature::now("Rand Om Hacker", "random@hacker.com");
//! repo.commit(Some("HEAD"), &sig, &sig, "This is a commit\n", tree).unwrap();
//!
//! let fs = TreeFs::from_reference_name(&repo, "refs/heads/main").unwrap();
//! let mut file = fs.open("/README").unwrap();
//! assert_eq!(file.read_all().unwrap(), b"foo\n");
//! assert_eq!(file.stat().unwrap().size(), 4);
//! file.close().unwrap();
//! ```

pub mod dir;
pub mod error;
pub mod file;
pub mod fs;
pub mod handle;
pub mod info;
pub mod resolve;

pub use dir::DirHandle;
pub use error::{FsError, FsResult};
pub use file::{FileHandle, Whence};
pub use fs::{FileSystem, TreeFs};
pub use handle::{Handle, VfsFile};
pub use info::{FileInfo, FileType};
pub use resolve::{Node, Resolved};

pub use std::io::SeekFrom;
