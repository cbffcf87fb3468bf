//! Error taxonomy for the inode graph, resolver, and mount table.
//!
//! `VfsErrorKind` is a short internal error set, independent of any host
//! ABI's numeric errno values; the mapping to WASI errno codes lives in
//! `wasi-vfs` since only that crate knows about them.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfsErrorKind {
    NotFound,
    NotDir,
    IsDir,
    Exists,
    Invalid,
    NotCapable,
    CrossDevice,
    Loop,
    BufTooSmall,
    Unsupported,
    DirNotEmpty,
    /// The fd or handle does not refer to a live file description.
    BadHandle,
    /// Opaque I/O failure forwarded from (or standing in for) the host ABI.
    Io,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?} in {context}")]
pub struct VfsError {
    kind: VfsErrorKind,
    context: &'static str,
}

impl VfsError {
    pub fn new(kind: VfsErrorKind, context: &'static str) -> Self {
        Self { kind, context }
    }

    pub fn kind(&self) -> VfsErrorKind {
        self.kind
    }

    pub fn context(&self) -> &'static str {
        self.context
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
