//! `vfs-core`: the in-memory inode/link graph, the path resolver over that
//! graph, and the mount table underlying the wasi-vfs kernel. This
//! crate has no notion of WASI, host descriptors, or the packed image
//! format — those live in `vfs-mem` (image decoding) and `wasi-vfs`
//! (interposition).

pub mod arena;
pub mod error;
pub mod flags;
pub mod graph;
pub mod link;
pub mod mount;
pub mod name;
pub mod node;
pub mod path;

pub use error::{VfsError, VfsErrorKind, VfsResult};
pub use flags::{OpenFlags, ResolveFlags, Rights};
pub use graph::InodeGraph;
pub use link::LinkId;
pub use mount::{Mount, MountTable};
pub use name::VfsName;
pub use node::{Dirent, NodeId, ReadDirBatch, VfsFileType};
pub use path::{resolve, ResolveContext, VfsPath, DEFAULT_SYMLINK_HOP_BOUND};
