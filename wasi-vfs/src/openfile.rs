//! The file description: either a VFS-backed open, or a bare passthrough to
//! a real host-ABI descriptor.

use vfs_core::{LinkId, NodeId, OpenFlags, Rights};

use crate::abi::Fd;

pub enum OpenFile {
    /// An open backed by the inode graph. `link`/`node` pin the entry (and,
    /// transitively via `vfs_core::InodeGraph::retain_open`, the node) alive
    /// for as long as this description exists.
    VfsOpen {
        link: LinkId,
        node: NodeId,
        /// The preopen root of the mount this descriptor lives under —
        /// resolution rooted at this descriptor bounds `..` there.
        mount_root: LinkId,
        cursor: u64,
        flags: OpenFlags,
        rights_base: Rights,
        rights_inheriting: Rights,
        /// Opaque `readdir` resume position; `0` means "start of stream".
        dir_cookie: u64,
    },
    /// A descriptor owned by the real host ABI, forwarded verbatim. Used for
    /// stdio, for host preopens not shadowed by a VFS mount, and for any
    /// path resolution that escapes the VFS into host territory.
    HostPassthrough {
        host_fd: Fd,
        is_preopen_dir: bool,
        preopen_prefix: Option<Vec<u8>>,
    },
}

impl OpenFile {
    pub fn is_vfs(&self) -> bool {
        matches!(self, OpenFile::VfsOpen { .. })
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            OpenFile::VfsOpen { node, .. } => Some(*node),
            OpenFile::HostPassthrough { .. } => None,
        }
    }
}
