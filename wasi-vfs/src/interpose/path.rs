//! Path-oriented host-ABI calls. Each entry point takes a base directory
//! descriptor plus a path relative to it (or absolute, if the path starts
//! with `/`) and resolves through [`vfs_core::resolve`] before touching the
//! graph.

use vfs_core::error::{VfsError, VfsErrorKind, VfsResult};
use vfs_core::{resolve, NodeId, OpenFlags, ResolveContext, Rights, VfsName};

use crate::abi::{Fdflags, Filestat, Filetype, Lookupflags, Oflags};
use crate::errno::Errno;
use crate::host_abi;
use crate::openfile::OpenFile;
use crate::state::{global, VfsState};

use super::{err_of, errno_to_i32, ok, read_guest_bytes, write_guest_bytes, write_out};

/// Splits `path` into `(parent_path, leaf_name)`. The parent half is itself
/// resolvable with [`resolve`]: empty means "the base descriptor itself",
/// `/` means "the mount root".
fn split_parent(path: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut trimmed = path;
    while trimmed.len() > 1 && trimmed.last() == Some(&b'/') {
        trimmed = &trimmed[..trimmed.len() - 1];
    }
    match trimmed.iter().rposition(|&b| b == b'/') {
        Some(pos) => {
            let mut parent = trimmed[..pos].to_vec();
            if parent.is_empty() {
                parent.push(b'/');
            }
            (parent, trimmed[pos + 1..].to_vec())
        }
        None => (Vec::new(), trimmed.to_vec()),
    }
}

fn ctx_for(state: &VfsState, base: &OpenFile, follow_final_symlink: bool) -> VfsResult<ResolveContext> {
    let mut ctx = state.resolve_ctx(base)?;
    ctx.follow_final_symlink = follow_final_symlink;
    Ok(ctx)
}

/// Resolves `path`'s parent directory to a node, for operations (create,
/// unlink, rename-source) that need `(dir_node, leaf_name)` rather than a
/// fully-resolved link.
fn resolve_parent(state: &VfsState, base: &OpenFile, path: &[u8]) -> VfsResult<(NodeId, Vec<u8>)> {
    let (parent_path, name) = split_parent(path);
    let ctx = ctx_for(state, base, true)?;
    let parent_link = resolve(&state.fs.graph, &ctx, &parent_path)?;
    let parent_node = state.fs.graph.link(parent_link)?.node;
    Ok((parent_node, name))
}

macro_rules! vfs_base {
    ($state:expr, $fd:expr) => {
        match $state.fds.get($fd) {
            Ok(f) => f,
            Err(e) => return err_of(&e),
        }
    };
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_create_directory(fd: i32, path: *const u8, path_len: i32) -> i32 {
    let mut state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe { host_abi::path_create_directory(host_fd, path as i32, path_len) };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let name = leaf_name(bytes);
    let vname = match VfsName::new(&name) {
        Ok(n) => n,
        Err(e) => return err_of(&e),
    };
    match resolve_parent_link(&state, base, bytes) {
        Ok(link) => match state.fs.graph.new_dir(link, vname) {
            Ok(_) => ok(),
            Err(e) => err_of(&e),
        },
        Err(e) => err_of(&e),
    }
}

/// Same as [`resolve_parent`] but returns the parent's *link* (needed by
/// graph constructors, which stamp it into the new entry's `parent` field).
fn resolve_parent_link(state: &VfsState, base: &OpenFile, path: &[u8]) -> VfsResult<vfs_core::LinkId> {
    let (parent_path, _name) = split_parent(path);
    let ctx = ctx_for(state, base, true)?;
    resolve(&state.fs.graph, &ctx, &parent_path)
}

fn leaf_name(path: &[u8]) -> Vec<u8> {
    split_parent(path).1
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_filestat_get(
    fd: i32,
    flags: i32,
    path: *const u8,
    path_len: i32,
    buf: *mut u8,
) -> i32 {
    let state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe { host_abi::path_filestat_get(host_fd, flags, path as i32, path_len, buf as i32) };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let follow = Lookupflags::from_bits_truncate(flags as u32).contains(Lookupflags::SYMLINK_FOLLOW);
    let ctx = match ctx_for(&state, base, follow) {
        Ok(c) => c,
        Err(e) => return err_of(&e),
    };
    let link = match resolve(&state.fs.graph, &ctx, bytes) {
        Ok(l) => l,
        Err(e) => return err_of(&e),
    };
    let node_id = match state.fs.graph.link(link) {
        Ok(l) => l.node,
        Err(e) => return err_of(&e),
    };
    let node = match state.fs.graph.node(node_id) {
        Ok(n) => n,
        Err(e) => return err_of(&e),
    };
    let size = match state.fs.graph.file_len(node_id) {
        Ok(n) => n,
        Err(_) => 0,
    };
    let stat = Filestat::new(node_id.index() as u64, Filetype::from(node.file_type()), node.nlink as u64, size);
    unsafe { write_out(buf, stat) };
    ok()
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_filestat_set_times(
    fd: i32,
    flags: i32,
    path: *const u8,
    path_len: i32,
    atim: i64,
    mtim: i64,
    fst_flags: i32,
) -> i32 {
    let state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe {
                host_abi::path_filestat_set_times(host_fd, flags, path as i32, path_len, atim, mtim, fst_flags)
            };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let ctx = match ctx_for(&state, base, true) {
        Ok(c) => c,
        Err(e) => return err_of(&e),
    };
    // Timestamps aren't modeled; validate the path resolves, then discard.
    match resolve(&state.fs.graph, &ctx, bytes) {
        Ok(_) => ok(),
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_link(
    old_fd: i32,
    old_flags: i32,
    old_path: *const u8,
    old_path_len: i32,
    new_fd: i32,
    new_path: *const u8,
    new_path_len: i32,
) -> i32 {
    let mut state = global().lock();
    let old_base = vfs_base!(state, old_fd);
    let new_base = vfs_base!(state, new_fd);
    match (old_base, new_base) {
        (OpenFile::HostPassthrough { host_fd: ofd, .. }, OpenFile::HostPassthrough { host_fd: nfd, .. }) => {
            let (ofd, nfd) = (*ofd, *nfd);
            drop(state);
            return unsafe {
                host_abi::path_link(
                    ofd,
                    old_flags,
                    old_path as i32,
                    old_path_len,
                    nfd,
                    new_path as i32,
                    new_path_len,
                )
            };
        }
        (OpenFile::VfsOpen { mount_root: old_root, .. }, OpenFile::VfsOpen { mount_root: new_root, .. }) => {
            if old_root != new_root {
                return errno_to_i32(Errno::Xdev);
            }
        }
        _ => return errno_to_i32(Errno::Xdev),
    }
    let old_bytes = unsafe { read_guest_bytes(old_path, old_path_len as u32) };
    let new_bytes = unsafe { read_guest_bytes(new_path, new_path_len as u32) };
    let follow = Lookupflags::from_bits_truncate(old_flags as u32).contains(Lookupflags::SYMLINK_FOLLOW);
    let old_ctx = match ctx_for(&state, old_base, follow) {
        Ok(c) => c,
        Err(e) => return err_of(&e),
    };
    let existing = match resolve(&state.fs.graph, &old_ctx, old_bytes) {
        Ok(l) => l,
        Err(e) => return err_of(&e),
    };
    let (new_parent_link, new_name) = match (resolve_parent_link(&state, new_base, new_bytes), leaf_name(new_bytes)) {
        (Ok(l), name) => (l, name),
        (Err(e), _) => return err_of(&e),
    };
    let vname = match VfsName::new(&new_name) {
        Ok(n) => n,
        Err(e) => return err_of(&e),
    };
    match state.fs.graph.hard_link(existing, new_parent_link, vname) {
        Ok(_) => ok(),
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_open(
    fd: i32,
    dirflags: i32,
    path: *const u8,
    path_len: i32,
    oflags: i32,
    fs_rights_base: i64,
    fs_rights_inheriting: i64,
    fdflags: i32,
    opened_fd: *mut u8,
) -> i32 {
    let mut state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe {
                host_abi::path_open(
                    host_fd,
                    dirflags,
                    path as i32,
                    path_len,
                    oflags,
                    fs_rights_base,
                    fs_rights_inheriting,
                    fdflags,
                    opened_fd as i32,
                )
            };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let (base_rights, base_mount_root) = match base {
        OpenFile::VfsOpen { rights_inheriting, mount_root, .. } => (*rights_inheriting, *mount_root),
        OpenFile::HostPassthrough { .. } => unreachable!("passthrough handled above"),
    };
    let path_bytes = unsafe { read_guest_bytes(path, path_len as u32) }.to_vec();
    let oflags = Oflags::from_bits_truncate(oflags as u16);
    let follow = Lookupflags::from_bits_truncate(dirflags as u32).contains(Lookupflags::SYMLINK_FOLLOW)
        && !oflags.contains(Oflags::EXCL);
    let ctx = match ctx_for(&state, base, follow) {
        Ok(c) => c,
        Err(e) => return err_of(&e),
    };

    let existing = resolve(&state.fs.graph, &ctx, &path_bytes);

    let link = match existing {
        Ok(link) => {
            if oflags.contains(Oflags::EXCL) {
                return errno_to_i32(Errno::Exist);
            }
            let node_id = match state.fs.graph.link(link) {
                Ok(l) => l.node,
                Err(e) => return err_of(&e),
            };
            let node = match state.fs.graph.node(node_id) {
                Ok(n) => n,
                Err(e) => return err_of(&e),
            };
            if oflags.contains(Oflags::DIRECTORY) && !node.is_dir() {
                return errno_to_i32(Errno::Notdir);
            }
            if oflags.contains(Oflags::TRUNC) {
                if node.is_dir() {
                    return errno_to_i32(Errno::Isdir);
                }
                if let Err(e) = state.fs.graph.set_len(node_id, 0) {
                    return err_of(&e);
                }
            }
            link
        }
        Err(e) if e.kind() == VfsErrorKind::NotFound && oflags.contains(Oflags::CREAT) => {
            let (parent_link, name) = match (
                resolve_parent_link(&state, base, &path_bytes),
                leaf_name(&path_bytes),
            ) {
                (Ok(l), name) => (l, name),
                (Err(e), _) => return err_of(&e),
            };
            let vname = match VfsName::new(&name) {
                Ok(n) => n,
                Err(e) => return err_of(&e),
            };
            match state.fs.graph.new_file(parent_link, vname, Vec::new()) {
                Ok(l) => l,
                Err(e) => return err_of(&e),
            }
        }
        Err(e) => return err_of(&e),
    };

    let node_id = match state.fs.graph.link(link) {
        Ok(l) => l.node,
        Err(e) => return err_of(&e),
    };
    if let Err(e) = state.fs.graph.retain_open(node_id) {
        return err_of(&e);
    }

    let wire_flags = Fdflags::from_bits_truncate(fdflags as u16);
    let mut open_flags = OpenFlags::empty();
    if wire_flags.contains(Fdflags::APPEND) {
        open_flags |= OpenFlags::APPEND;
    }
    if oflags.contains(Oflags::DIRECTORY) {
        open_flags |= OpenFlags::DIRECTORY;
    }
    let want_base = Rights::from_bits_truncate(fs_rights_base as u64);
    let want_inheriting = Rights::from_bits_truncate(fs_rights_inheriting as u64);
    // A new open's rights can never exceed the directory it was reached
    // through — rights only narrow down a resolution chain.
    let rights_base = base_rights & want_base;
    let rights_inheriting = base_rights & want_inheriting;

    let new_fd = state.fds.insert(OpenFile::VfsOpen {
        link,
        node: node_id,
        mount_root: base_mount_root,
        cursor: 0,
        flags: open_flags,
        rights_base,
        rights_inheriting,
        dir_cookie: 0,
    });
    unsafe { write_out(opened_fd, new_fd) };
    ok()
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_readlink(
    fd: i32,
    path: *const u8,
    path_len: i32,
    buf: *mut u8,
    buf_len: i32,
    bufused: *mut u8,
) -> i32 {
    let state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe {
                host_abi::path_readlink(host_fd, path as i32, path_len, buf as i32, buf_len, bufused as i32)
            };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let ctx = match ctx_for(&state, base, false) {
        Ok(c) => c,
        Err(e) => return err_of(&e),
    };
    let link = match resolve(&state.fs.graph, &ctx, bytes) {
        Ok(l) => l,
        Err(e) => return err_of(&e),
    };
    let node_id = match state.fs.graph.link(link) {
        Ok(l) => l.node,
        Err(e) => return err_of(&e),
    };
    let target = match state.fs.graph.readlink(node_id) {
        Ok(t) => t,
        Err(e) => return err_of(&e),
    };
    if target.len() > buf_len as usize {
        return errno_to_i32(Errno::Overflow);
    }
    let n = unsafe { write_guest_bytes(buf, buf_len as u32, &target) };
    unsafe { write_out(bufused, n) };
    ok()
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_remove_directory(fd: i32, path: *const u8, path_len: i32) -> i32 {
    let mut state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe { host_abi::path_remove_directory(host_fd, path as i32, path_len) };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let (parent_node, name) = match resolve_parent(&state, base, bytes) {
        Ok(v) => v,
        Err(e) => return err_of(&e),
    };
    match state.fs.graph.rmdir(parent_node, &name) {
        Ok(()) => ok(),
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_rename(
    fd: i32,
    old_path: *const u8,
    old_path_len: i32,
    new_fd: i32,
    new_path: *const u8,
    new_path_len: i32,
) -> i32 {
    let mut state = global().lock();
    let old_base = vfs_base!(state, fd);
    let new_base = vfs_base!(state, new_fd);
    match (old_base, new_base) {
        (OpenFile::HostPassthrough { host_fd: ofd, .. }, OpenFile::HostPassthrough { host_fd: nfd, .. }) => {
            let (ofd, nfd) = (*ofd, *nfd);
            drop(state);
            return unsafe {
                host_abi::path_rename(ofd, old_path as i32, old_path_len, nfd, new_path as i32, new_path_len)
            };
        }
        (OpenFile::VfsOpen { mount_root: old_root, .. }, OpenFile::VfsOpen { mount_root: new_root, .. }) => {
            if old_root != new_root {
                return errno_to_i32(Errno::Xdev);
            }
        }
        _ => return errno_to_i32(Errno::Xdev),
    }
    let old_bytes = unsafe { read_guest_bytes(old_path, old_path_len as u32) };
    let new_bytes = unsafe { read_guest_bytes(new_path, new_path_len as u32) };
    let (old_parent, old_name) = match resolve_parent(&state, old_base, old_bytes) {
        Ok(v) => v,
        Err(e) => return err_of(&e),
    };
    let (new_parent_link, new_name) = match (
        resolve_parent_link(&state, new_base, new_bytes),
        leaf_name(new_bytes),
    ) {
        (Ok(l), name) => (l, name),
        (Err(e), _) => return err_of(&e),
    };
    let new_parent_node = match state.fs.graph.link(new_parent_link) {
        Ok(l) => l.node,
        Err(e) => return err_of(&e),
    };
    let vname = match VfsName::new(&new_name) {
        Ok(n) => n,
        Err(e) => return err_of(&e),
    };
    match state
        .fs
        .graph
        .rename(old_parent, &old_name, new_parent_link, new_parent_node, vname)
    {
        Ok(()) => ok(),
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_symlink(
    old_path: *const u8,
    old_path_len: i32,
    fd: i32,
    new_path: *const u8,
    new_path_len: i32,
) -> i32 {
    let mut state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe {
                host_abi::path_symlink(old_path as i32, old_path_len, host_fd, new_path as i32, new_path_len)
            };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let target = unsafe { read_guest_bytes(old_path, old_path_len as u32) }.to_vec();
    let new_bytes = unsafe { read_guest_bytes(new_path, new_path_len as u32) };
    let (parent_link, name) = match (resolve_parent_link(&state, base, new_bytes), leaf_name(new_bytes)) {
        (Ok(l), name) => (l, name),
        (Err(e), _) => return err_of(&e),
    };
    let vname = match VfsName::new(&name) {
        Ok(n) => n,
        Err(e) => return err_of(&e),
    };
    match state.fs.graph.new_symlink(parent_link, vname, target) {
        Ok(_) => ok(),
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_path_unlink_file(fd: i32, path: *const u8, path_len: i32) -> i32 {
    let mut state = global().lock();
    let base = vfs_base!(state, fd);
    match base {
        OpenFile::HostPassthrough { host_fd, .. } => {
            let host_fd = *host_fd;
            drop(state);
            return unsafe { host_abi::path_unlink_file(host_fd, path as i32, path_len) };
        }
        OpenFile::VfsOpen { .. } => {}
    }
    let bytes = unsafe { read_guest_bytes(path, path_len as u32) };
    let (parent_node, name) = match resolve_parent(&state, base, bytes) {
        Ok(v) => v,
        Err(e) => return err_of(&e),
    };
    match state.fs.graph.unlink(parent_node, &name) {
        Ok(()) => ok(),
        Err(e) => err_of(&e),
    }
}

/// Opens `path` (relative to `fd`'s VFS mount, or absolute) as a new VFS
/// directory descriptor for subsequent relative resolution — the
/// interposition side of a guest's chdir emulation, since preview-1 has no
/// `fd_chdir` of its own and libc instead re-resolves every relative path
/// against a remembered base fd. Not part of the numbered host ABI;
/// callable directly by an embedder that wants a `cwd`-like descriptor.
pub fn resolve_at(fd: i32, path: &[u8]) -> Result<i32, Errno> {
    let mut state = global().lock();
    let base = state.fds.get(fd).map_err(|e| vfs_error_errno(&e))?;
    let ctx = ctx_for(&state, base, true).map_err(|e| vfs_error_errno(&e))?;
    let mount_root = match base {
        OpenFile::VfsOpen { mount_root, .. } => *mount_root,
        OpenFile::HostPassthrough { .. } => return Err(Errno::Notcapable),
    };
    let link = resolve(&state.fs.graph, &ctx, path).map_err(|e| vfs_error_errno(&e))?;
    let node = state.fs.graph.link(link).map_err(|e| vfs_error_errno(&e))?.node;
    if !state
        .fs
        .graph
        .node(node)
        .map_err(|e| vfs_error_errno(&e))?
        .is_dir()
    {
        return Err(Errno::Notdir);
    }
    if let Err(e) = state.fs.graph.retain_open(node) {
        return Err(vfs_error_errno(&e));
    }
    Ok(state.fds.insert(OpenFile::VfsOpen {
        link,
        node,
        mount_root,
        cursor: 0,
        flags: OpenFlags::DIRECTORY,
        rights_base: Rights::all(),
        rights_inheriting: Rights::all(),
        dir_cookie: 0,
    }))
}

fn vfs_error_errno(e: &VfsError) -> Errno {
    crate::errno::vfs_error_kind_to_errno(e.kind())
}
