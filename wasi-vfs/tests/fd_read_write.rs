use std::sync::{Mutex, MutexGuard, OnceLock};

use vfs_core::{OpenFlags, Rights, VfsName};
use wasi_vfs::abi::{Ciovec, Iovec};
use wasi_vfs::interpose::fd;
use wasi_vfs::openfile::OpenFile;

fn test_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

fn fresh_file_fd(rights: Rights) -> i32 {
    let mut state = wasi_vfs::global().lock();
    state.reset();
    let root = state.fs.graph.new_preopen_dir();
    state.fs.mounts.add_mount(b"/".to_vec(), root, false).unwrap();
    let link = state
        .fs
        .graph
        .new_file(root, VfsName::new(b"a.txt").unwrap(), Vec::new())
        .unwrap();
    let node = state.fs.graph.link(link).unwrap().node;
    state.fs.graph.retain_open(node).unwrap();
    state.fds.insert(OpenFile::VfsOpen {
        link,
        node,
        mount_root: root,
        cursor: 0,
        flags: OpenFlags::empty(),
        rights_base: rights,
        rights_inheriting: rights,
        dir_cookie: 0,
    })
}

#[test]
fn write_then_read_round_trips_through_the_cursor() {
    let _guard = test_lock();
    let fd = fresh_file_fd(Rights::all());

    let data = b"hello wasi";
    let iov = Ciovec {
        buf: data.as_ptr(),
        buf_len: data.len() as u32,
    };
    let mut nwritten: u32 = 0;
    let rc = fd::wasi_vfs_fd_write(fd, &iov, 1, &mut nwritten as *mut u32 as *mut u8);
    assert_eq!(rc, 0);
    assert_eq!(nwritten, data.len() as u32);

    let mut seek_pos: u64 = 0xdead;
    let rc = fd::wasi_vfs_fd_seek(fd, 0, 0, &mut seek_pos as *mut u64 as *mut u8);
    assert_eq!(rc, 0);
    assert_eq!(seek_pos, 0);

    let mut buf = vec![0u8; data.len()];
    let iov = Iovec {
        buf: buf.as_mut_ptr(),
        buf_len: buf.len() as u32,
    };
    let mut nread: u32 = 0;
    let rc = fd::wasi_vfs_fd_read(fd, &iov, 1, &mut nread as *mut u32 as *mut u8);
    assert_eq!(rc, 0);
    assert_eq!(nread, data.len() as u32);
    assert_eq!(&buf, data);
}

#[test]
fn pwrite_past_eof_zero_pads_the_gap() {
    let _guard = test_lock();
    let fd = fresh_file_fd(Rights::all());

    let data = b"end";
    let iov = Ciovec {
        buf: data.as_ptr(),
        buf_len: data.len() as u32,
    };
    let mut nwritten: u32 = 0;
    let rc = fd::wasi_vfs_fd_pwrite(fd, &iov, 1, 5, &mut nwritten as *mut u32 as *mut u8);
    assert_eq!(rc, 0);

    let mut buf = vec![0u8; 8];
    let iov = Iovec {
        buf: buf.as_mut_ptr(),
        buf_len: buf.len() as u32,
    };
    let mut nread: u32 = 0;
    let rc = fd::wasi_vfs_fd_pread(fd, &iov, 1, 0, &mut nread as *mut u32 as *mut u8);
    assert_eq!(rc, 0);
    assert_eq!(nread, 8);
    assert_eq!(&buf[..5], &[0, 0, 0, 0, 0]);
    assert_eq!(&buf[5..], b"end");
}

#[test]
fn write_without_fd_write_right_is_rejected() {
    let _guard = test_lock();
    let fd = fresh_file_fd(Rights::all() & !Rights::FD_WRITE);

    let data = b"x";
    let iov = Ciovec {
        buf: data.as_ptr(),
        buf_len: 1,
    };
    let mut nwritten: u32 = 0;
    let rc = fd::wasi_vfs_fd_write(fd, &iov, 1, &mut nwritten as *mut u32 as *mut u8);
    assert_eq!(rc, u16::from(wasi_vfs::Errno::Notcapable) as i32);
}

#[test]
fn fdstat_set_rights_can_only_narrow() {
    let _guard = test_lock();
    let fd = fresh_file_fd(Rights::FD_READ | Rights::FD_WRITE);

    let rc = fd::wasi_vfs_fd_fdstat_set_rights(fd, Rights::FD_READ.bits() as i64, 0);
    assert_eq!(rc, 0);

    // Trying to regain FD_WRITE, which was just narrowed away, must fail.
    let rc = fd::wasi_vfs_fd_fdstat_set_rights(fd, (Rights::FD_READ | Rights::FD_WRITE).bits() as i64, 0);
    assert_eq!(rc, u16::from(wasi_vfs::Errno::Notcapable) as i32);
}

#[test]
fn close_reaps_an_unlinked_node_once_the_last_open_count_drops() {
    let _guard = test_lock();
    let mut state = wasi_vfs::global().lock();
    state.reset();
    let root = state.fs.graph.new_preopen_dir();
    state.fs.mounts.add_mount(b"/".to_vec(), root, false).unwrap();
    let link = state
        .fs
        .graph
        .new_file(root, VfsName::new(b"tmp").unwrap(), Vec::new())
        .unwrap();
    let node = state.fs.graph.link(link).unwrap().node;
    state.fs.graph.retain_open(node).unwrap();
    let fd = state.fds.insert(OpenFile::VfsOpen {
        link,
        node,
        mount_root: root,
        cursor: 0,
        flags: OpenFlags::empty(),
        rights_base: Rights::all(),
        rights_inheriting: Rights::all(),
        dir_cookie: 0,
    });
    let root_node = state.fs.graph.link(root).unwrap().node;
    state.fs.graph.unlink(root_node, b"tmp").unwrap();
    assert!(state.fs.graph.node(node).is_ok(), "still pinned by the open fd");
    drop(state);

    let rc = fd::wasi_vfs_fd_close(fd);
    assert_eq!(rc, 0);

    let state = wasi_vfs::global().lock();
    assert!(state.fs.graph.node(node).is_err(), "node must be reaped once unreferenced");
}
