//! Descriptor-oriented host-ABI calls.

use tracing::trace;
use vfs_core::{OpenFlags, Rights};

use crate::abi::{Fdflags, Fdstat, Filestat, Filetype, WireDirent};
use crate::errno::Errno;
use crate::host_abi;
use crate::openfile::OpenFile;
use crate::state::global;

use super::{err_of, errno_to_i32, ok, read_guest_bytes, write_guest_bytes, write_out};

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_advise(fd: i32, offset: i64, len: i64, advice: i32) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen { .. }) => ok(),
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_advise(host_fd, offset, len, advice) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_allocate(fd: i32, offset: i64, len: i64) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen { node, .. }) => {
            let node = *node;
            let want = offset as u64 + len as u64;
            let cur = match state.fs.graph.file_len(node) {
                Ok(n) => n,
                Err(e) => return err_of(&e),
            };
            if want > cur {
                if let Err(e) = state.fs.graph.set_len(node, want) {
                    return err_of(&e);
                }
            }
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_allocate(host_fd, offset, len) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_close(fd: i32) -> i32 {
    let mut state = global().lock();
    let closed = match state.fds.close(fd) {
        Ok(f) => f,
        Err(e) => return err_of(&e),
    };
    if let OpenFile::VfsOpen { node, .. } = closed {
        let _ = state.fs.graph.release_open(node);
    }
    trace!(fd, "fd_close");
    ok()
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_datasync(fd: i32) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen { .. }) => ok(),
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_datasync(host_fd) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_sync(fd: i32) -> i32 {
    wasi_vfs_fd_datasync(fd)
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_fdstat_get(fd: i32, buf: *mut u8) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen {
            node,
            rights_base,
            rights_inheriting,
            flags,
            ..
        }) => {
            let file_type = match state.fs.graph.node(*node) {
                Ok(n) => Filetype::from(n.file_type()),
                Err(e) => return err_of(&e),
            };
            let wire_flags = if flags.contains(OpenFlags::APPEND) {
                Fdflags::APPEND
            } else {
                Fdflags::empty()
            };
            let stat = Fdstat::new(
                file_type,
                wire_flags,
                rights_base.bits(),
                rights_inheriting.bits(),
            );
            unsafe { write_out(buf, stat) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_fdstat_get(host_fd, buf as i32) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_fdstat_set_flags(fd: i32, flags: i32) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen { flags: f, .. }) => {
            let wire = crate::abi::Fdflags::from_bits_truncate(flags as u16);
            f.set(OpenFlags::APPEND, wire.contains(crate::abi::Fdflags::APPEND));
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_fdstat_set_flags(host_fd, flags) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_fdstat_set_rights(fd: i32, rights_base: i64, rights_inheriting: i64) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen {
            rights_base: base,
            rights_inheriting: inheriting,
            ..
        }) => {
            let want_base = Rights::from_bits_truncate(rights_base as u64);
            let want_inheriting = Rights::from_bits_truncate(rights_inheriting as u64);
            // Rights may only narrow, never widen.
            if !base.contains(want_base) || !inheriting.contains(want_inheriting) {
                return errno_to_i32(Errno::Notcapable);
            }
            *base = want_base;
            *inheriting = want_inheriting;
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_fdstat_set_rights(host_fd, rights_base, rights_inheriting) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_filestat_get(fd: i32, buf: *mut u8) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen { node, .. }) => {
            let n = match state.fs.graph.node(*node) {
                Ok(n) => n,
                Err(e) => return err_of(&e),
            };
            let size = match &n.kind {
                vfs_core::node::NodeKind::File { bytes, .. } => bytes.len() as u64,
                vfs_core::node::NodeKind::Directory { .. } => 0,
            };
            let stat = Filestat::new(node.index() as u64, Filetype::from(n.file_type()), n.nlink as u64, size);
            unsafe { write_out(buf, stat) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_filestat_get(host_fd, buf as i32) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_filestat_set_size(fd: i32, size: i64) -> i32 {
    let mut state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen { node, .. }) => {
            let node = *node;
            match state.fs.graph.set_len(node, size as u64) {
                Ok(()) => ok(),
                Err(e) => err_of(&e),
            }
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_filestat_set_size(host_fd, size) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_filestat_set_times(fd: i32, atim: i64, mtim: i64, fst_flags: i32) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        // Timestamps aren't modeled; accept and discard.
        Ok(OpenFile::VfsOpen { .. }) => ok(),
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_filestat_set_times(host_fd, atim, mtim, fst_flags) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_pread(
    fd: i32,
    iovs: *const crate::abi::Iovec,
    iovs_len: i32,
    offset: i64,
    nread: *mut u8,
) -> i32 {
    read_impl(fd, iovs, iovs_len, Some(offset as u64), nread)
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_read(fd: i32, iovs: *const crate::abi::Iovec, iovs_len: i32, nread: *mut u8) -> i32 {
    read_impl(fd, iovs, iovs_len, None, nread)
}

fn read_impl(
    fd: i32,
    iovs: *const crate::abi::Iovec,
    iovs_len: i32,
    explicit_offset: Option<u64>,
    nread: *mut u8,
) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen { node, cursor, rights_base, .. }) => {
            if !rights_base.contains(Rights::FD_READ) {
                return errno_to_i32(Errno::Notcapable);
            }
            let node = *node;
            let start = explicit_offset.unwrap_or(*cursor);
            let mut total = 0usize;
            for i in 0..iovs_len {
                let iov = unsafe { &*iovs.offset(i as isize) };
                let mut buf = vec![0u8; iov.buf_len as usize];
                let n = match state.fs.graph.read_at(node, start + total as u64, &mut buf) {
                    Ok(n) => n,
                    Err(e) => return err_of(&e),
                };
                unsafe {
                    std::ptr::copy_nonoverlapping(buf.as_ptr(), iov.buf, n);
                }
                total += n;
                if n < iov.buf_len as usize {
                    break;
                }
            }
            if explicit_offset.is_none() {
                if let Ok(OpenFile::VfsOpen { cursor, .. }) = state.fds.get_mut(fd) {
                    *cursor += total as u64;
                }
            }
            unsafe { write_out(nread, total as u32) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            match explicit_offset {
                Some(offset) => unsafe {
                    host_abi::fd_pread(host_fd, iovs as i32, iovs_len, offset as i64, nread as i32)
                },
                None => unsafe { host_abi::fd_read(host_fd, iovs as i32, iovs_len, nread as i32) },
            }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_pwrite(
    fd: i32,
    iovs: *const crate::abi::Ciovec,
    iovs_len: i32,
    offset: i64,
    nwritten: *mut u8,
) -> i32 {
    write_impl(fd, iovs, iovs_len, Some(offset as u64), nwritten)
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_write(
    fd: i32,
    iovs: *const crate::abi::Ciovec,
    iovs_len: i32,
    nwritten: *mut u8,
) -> i32 {
    write_impl(fd, iovs, iovs_len, None, nwritten)
}

fn write_impl(
    fd: i32,
    iovs: *const crate::abi::Ciovec,
    iovs_len: i32,
    explicit_offset: Option<u64>,
    nwritten: *mut u8,
) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen {
            node, cursor, flags, rights_base, ..
        }) => {
            if !rights_base.contains(Rights::FD_WRITE) {
                return errno_to_i32(Errno::Notcapable);
            }
            let node = *node;
            let append = flags.contains(OpenFlags::APPEND);
            let mut total = 0usize;
            for i in 0..iovs_len {
                let iov = unsafe { &*iovs.offset(i as isize) };
                let data = unsafe { read_guest_bytes(iov.buf, iov.buf_len) };
                let at = if append {
                    match state.fs.graph.file_len(node) {
                        Ok(n) => n,
                        Err(e) => return err_of(&e),
                    }
                } else {
                    explicit_offset.unwrap_or(*cursor) + total as u64
                };
                match state.fs.graph.write_at(node, at, data) {
                    Ok(n) => total += n,
                    Err(e) => return err_of(&e),
                }
            }
            if explicit_offset.is_none() && !append {
                if let Ok(OpenFile::VfsOpen { cursor, .. }) = state.fds.get_mut(fd) {
                    *cursor += total as u64;
                }
            }
            unsafe { write_out(nwritten, total as u32) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            match explicit_offset {
                Some(offset) => unsafe {
                    host_abi::fd_pwrite(host_fd, iovs as i32, iovs_len, offset as i64, nwritten as i32)
                },
                None => unsafe { host_abi::fd_write(host_fd, iovs as i32, iovs_len, nwritten as i32) },
            }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_seek(fd: i32, offset: i64, whence: i32, newoffset: *mut u8) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen { node, cursor, rights_base, .. }) => {
            if !rights_base.contains(Rights::FD_SEEK) {
                return errno_to_i32(Errno::Notcapable);
            }
            let node = *node;
            let len = match state.fs.graph.file_len(node) {
                Ok(n) => n as i64,
                Err(e) => return err_of(&e),
            };
            let base = match whence {
                0 => 0,           // Set
                1 => *cursor as i64, // Cur
                2 => len,          // End
                _ => return errno_to_i32(Errno::Inval),
            };
            let new_pos = base + offset;
            if new_pos < 0 {
                return errno_to_i32(Errno::Inval);
            }
            *cursor = new_pos as u64;
            unsafe { write_out(newoffset, *cursor) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_seek(host_fd, offset, whence, newoffset as i32) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_tell(fd: i32, offset: *mut u8) -> i32 {
    let state = global().lock();
    match state.fds.get(fd) {
        Ok(OpenFile::VfsOpen { cursor, rights_base, .. }) => {
            if !rights_base.contains(Rights::FD_TELL) {
                return errno_to_i32(Errno::Notcapable);
            }
            unsafe { write_out(offset, *cursor) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_tell(host_fd, offset as i32) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_prestat_get(fd: i32, buf: *mut u8) -> i32 {
    let state = global().lock();
    match state.preopens.iter().find(|(pfd, _)| *pfd == fd) {
        Some((_, prefix)) => {
            let stat = crate::abi::PrestatDir {
                pr_name_len: prefix.len() as u32,
            };
            unsafe { write_out(buf, stat) };
            ok()
        }
        None => match state.fds.get(fd) {
            Ok(OpenFile::HostPassthrough { host_fd, is_preopen_dir: true, .. }) => {
                let host_fd = *host_fd;
                drop(state);
                unsafe { host_abi::fd_prestat_get(host_fd, buf as i32) }
            }
            Ok(_) => errno_to_i32(Errno::Badf),
            Err(e) => err_of(&e),
        },
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_prestat_dir_name(fd: i32, path: *mut u8, path_len: i32) -> i32 {
    let state = global().lock();
    match state.preopens.iter().find(|(pfd, _)| *pfd == fd) {
        Some((_, prefix)) => {
            if prefix.len() > path_len as usize {
                return errno_to_i32(Errno::Overflow);
            }
            unsafe { write_guest_bytes(path, path_len as u32, prefix) };
            ok()
        }
        None => match state.fds.get(fd) {
            Ok(OpenFile::HostPassthrough { host_fd, is_preopen_dir: true, .. }) => {
                let host_fd = *host_fd;
                drop(state);
                unsafe { host_abi::fd_prestat_dir_name(host_fd, path as i32, path_len) }
            }
            Ok(_) => errno_to_i32(Errno::Badf),
            Err(e) => err_of(&e),
        },
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_readdir(
    fd: i32,
    buf: *mut u8,
    buf_len: i32,
    cookie: i64,
    bufused: *mut u8,
) -> i32 {
    let mut state = global().lock();
    match state.fds.get_mut(fd) {
        Ok(OpenFile::VfsOpen { node, rights_base, .. }) => {
            if !rights_base.contains(Rights::FD_READDIR) {
                return errno_to_i32(Errno::Notcapable);
            }
            let node = *node;
            let batch = match state.fs.graph.read_dir(node, cookie as u64, 512) {
                Ok(b) => b,
                Err(e) => return err_of(&e),
            };
            let mut written = 0u32;
            let mut remaining = buf_len as u32;
            for entry in &batch.entries {
                let rec = WireDirent::new(
                    entry.next_cookie,
                    entry.link.index() as u64,
                    entry.name.as_bytes().len() as u32,
                    Filetype::from(entry.file_type),
                );
                let header_len = std::mem::size_of::<WireDirent>() as u32;
                if remaining == 0 {
                    break;
                }
                let hn = rec.write_header(unsafe {
                    std::slice::from_raw_parts_mut(buf.add(written as usize), remaining.min(header_len) as usize)
                });
                written += hn as u32;
                remaining = remaining.saturating_sub(hn as u32);
                if remaining == 0 {
                    break;
                }
                let name_bytes = entry.name.as_bytes();
                let nn = unsafe { write_guest_bytes(buf.add(written as usize), remaining, name_bytes) };
                written += nn;
                remaining = remaining.saturating_sub(nn);
                if remaining == 0 {
                    break;
                }
            }
            unsafe { write_out(bufused, written) };
            ok()
        }
        Ok(OpenFile::HostPassthrough { host_fd, .. }) => {
            let host_fd = *host_fd;
            drop(state);
            unsafe { host_abi::fd_readdir(host_fd, buf as i32, buf_len, cookie, bufused as i32) }
        }
        Err(e) => err_of(&e),
    }
}

#[no_mangle]
pub extern "C" fn wasi_vfs_fd_renumber(fd: i32, to: i32) -> i32 {
    let mut state = global().lock();
    match state.fds.renumber(fd, to) {
        Ok(()) => ok(),
        Err(e) => err_of(&e),
    }
}
