//! The startup/image loader and its reactor-model counterpart. The external
//! constructor that calls `__internal_wasi_vfs_rt_init` runs with an
//! ordering priority ahead of wasi-libc's own preopen populator, so the
//! VFS's preopens are already registered by the time it walks the fd table.

use tracing::{error, trace};
use vfs_core::{OpenFlags, Rights};

use crate::openfile::OpenFile;
use crate::state::{global, VfsState};

/// The build-side packer (out of scope here) patches this array's bytes
/// post-link; an un-packed guest sees the zero-length placeholder below and
/// starts with no mounts at all, which is also exactly what a `cargo test`
/// binary linking this crate sees.
#[no_mangle]
pub static mut WASI_VFS_EMBEDDED_IMAGE: [u8; 4] = 0u32.to_le_bytes();

fn embedded_image() -> &'static [u8] {
    // SAFETY: the packer only ever rewrites this array's bytes before the
    // guest binary is instantiated; nothing in the running guest mutates it
    // afterwards, so a shared read here never races a write.
    unsafe { &WASI_VFS_EMBEDDED_IMAGE }
}

/// A dummy symbol referenced from nowhere at the Rust level, kept only so
/// the object file containing the `#[no_mangle]` exports below always gets
/// pulled into the final link.
#[no_mangle]
pub extern "C" fn __wasi_vfs_force_link_init() {}

/// Materializes the embedded image into the inode graph and registers one
/// preopen descriptor per mount. Must run before any guest code observes
/// the fd table.
#[no_mangle]
pub extern "C" fn __internal_wasi_vfs_rt_init() {
    let image = embedded_image();
    if image.len() <= 4 {
        trace!("no embedded image; starting with an empty VFS");
        return;
    }
    let mut state = global().lock();
    if let Err(err) = state.fs.load_image(image) {
        error!(?err, "corrupted embedded image, aborting startup");
        std::process::abort();
    }
    register_preopens(&mut state);
}

/// The reactor-model `wasi_vfs_pack_fs` export: tears down the previous
/// mount set entirely, then installs and registers the newly supplied
/// image, so a repack from a running instance never leaves stale mounts
/// addressable alongside the new ones.
///
/// # Safety
/// `ptr` must point at `len` readable bytes for the duration of this call —
/// the same contract as every other pointer-taking export in this crate,
/// since the guest calls directly into guest linear memory.
#[no_mangle]
pub unsafe extern "C" fn wasi_vfs_pack_fs(ptr: *const u8, len: u32) {
    let bytes = std::slice::from_raw_parts(ptr, len as usize);
    let mut state = global().lock();
    if let Err(err) = state.fs.repack(bytes) {
        error!(?err, "repack failed, aborting");
        std::process::abort();
    }
    state.preopens.clear();
    register_preopens(&mut state);
}

/// Creates one VFS preopen descriptor per registered mount, in mount-table
/// order, and records `(fd, prefix)` so `fd_prestat_get`/`fd_prestat_dir_name`
/// can answer without re-walking the mount table.
fn register_preopens(state: &mut VfsState) {
    let mounts: Vec<_> = state
        .fs
        .mounts
        .mounts()
        .iter()
        .map(|m| (m.prefix.clone(), m.root))
        .collect();
    for (prefix, root) in mounts {
        let node = match state.fs.graph.link(root) {
            Ok(link) => link.node,
            Err(_) => continue,
        };
        let fd = state.fds.insert(OpenFile::VfsOpen {
            link: root,
            node,
            mount_root: root,
            cursor: 0,
            flags: OpenFlags::READ | OpenFlags::DIRECTORY,
            rights_base: Rights::all(),
            rights_inheriting: Rights::all(),
            dir_cookie: 0,
        });
        state.preopens.push((fd, prefix));
    }
}
