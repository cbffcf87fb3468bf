//! Loader-tunable constants. There is no runtime config file — the packer
//! and CLI driver that would read one are out of scope — but the startup
//! hook's behavior still has a couple of knobs worth naming instead of
//! burying as magic numbers.

use vfs_core::DEFAULT_SYMLINK_HOP_BOUND;

#[derive(Debug, Clone, Copy)]
pub struct VfsConfig {
    /// Maximum symlink hops a single path resolution may take before
    /// failing with `Loop`.
    pub symlink_hop_bound: usize,
    /// Number of low descriptor numbers (0, 1, 2 — stdin/stdout/stderr)
    /// the fd table never hands out to `path_open`/preopen registration,
    /// matching the host ABI's own reserved band.
    pub reserved_preopen_band: u32,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            symlink_hop_bound: DEFAULT_SYMLINK_HOP_BOUND,
            reserved_preopen_band: 3,
        }
    }
}
