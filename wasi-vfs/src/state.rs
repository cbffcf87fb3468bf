//! Process-wide VFS state: the inode graph, the mount table, the file
//! description table, and the registered preopen prefixes. One instance per
//! guest instance (single-threaded, single-instance); guarded by a
//! `parking_lot::Mutex` purely so the interposition layer has somewhere
//! uniform to borrow from — the guest ABI itself never calls us from more
//! than one thread.

use std::sync::OnceLock;

use parking_lot::Mutex;
use vfs_core::error::{VfsError, VfsErrorKind, VfsResult};
use vfs_mem::MemFs;

use crate::abi::Fd;
use crate::config::VfsConfig;
use crate::fdtable::FdTable;
use crate::openfile::OpenFile;

pub struct VfsState {
    pub fs: MemFs,
    pub fds: FdTable,
    pub config: VfsConfig,
    /// `(fd, guest_prefix)` for every VFS preopen, in registration order.
    pub preopens: Vec<(Fd, Vec<u8>)>,
}

impl VfsState {
    pub fn new(config: VfsConfig) -> Self {
        Self {
            fs: MemFs::new(),
            fds: FdTable::new(config.reserved_preopen_band),
            config,
            preopens: Vec::new(),
        }
    }

    /// Clears every preopen and open-file entry above the reserved band,
    /// and resets the graph and mount table — the teardown half of a
    /// reactor-model repack.
    pub fn reset(&mut self) {
        self.fs = MemFs::new();
        self.fds = FdTable::new(self.config.reserved_preopen_band);
        self.preopens.clear();
    }

    pub fn resolve_ctx(&self, base: &OpenFile) -> VfsResult<vfs_core::ResolveContext> {
        match base {
            OpenFile::VfsOpen { link, mount_root, .. } => Ok(vfs_core::ResolveContext {
                root: *mount_root,
                base: *link,
                follow_final_symlink: true,
                symlink_hop_bound: self.config.symlink_hop_bound,
            }),
            OpenFile::HostPassthrough { .. } => {
                Err(VfsError::new(VfsErrorKind::NotCapable, "resolve_ctx.host_base"))
            }
        }
    }
}

static STATE: OnceLock<Mutex<VfsState>> = OnceLock::new();

/// The global instance, created on first touch with default config. Startup
/// (`__internal_wasi_vfs_rt_init`) runs before any guest code gets a chance
/// to call an interposed function, so by the time anything observes this
/// it already holds the materialized image.
pub fn global() -> &'static Mutex<VfsState> {
    STATE.get_or_init(|| Mutex::new(VfsState::new(VfsConfig::default())))
}
