use std::sync::{Mutex, MutexGuard, OnceLock};

use vfs_core::{OpenFlags, Rights, VfsName};
use wasi_vfs::interpose::poll;
use wasi_vfs::openfile::OpenFile;

fn test_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

const SUBSCRIPTION_SIZE: usize = 48;
const EVENT_SIZE: usize = 32;

fn fd_read_subscription(userdata: u64, fd: i32) -> [u8; SUBSCRIPTION_SIZE] {
    let mut buf = [0u8; SUBSCRIPTION_SIZE];
    buf[0..8].copy_from_slice(&userdata.to_le_bytes());
    buf[8] = 1; // EVENTTYPE_FD_READ
    buf[16..20].copy_from_slice(&fd.to_le_bytes());
    buf
}

#[test]
fn vfs_fd_subscriptions_are_always_immediately_ready() {
    let _guard = test_lock();
    let mut state = wasi_vfs::global().lock();
    state.reset();
    let root = state.fs.graph.new_preopen_dir();
    state.fs.mounts.add_mount(b"/".to_vec(), root, false).unwrap();
    let link = state
        .fs
        .graph
        .new_file(root, VfsName::new(b"f").unwrap(), b"xyz".to_vec())
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
    drop(state);

    let sub = fd_read_subscription(42, fd);
    let mut events = [0u8; EVENT_SIZE];
    let mut nevents: u32 = 0;
    let rc = poll::wasi_vfs_poll_oneoff(
        sub.as_ptr(),
        events.as_mut_ptr(),
        1,
        &mut nevents as *mut u32 as *mut u8,
    );
    assert_eq!(rc, 0);
    assert_eq!(nevents, 1);
    let userdata = u64::from_le_bytes(events[0..8].try_into().unwrap());
    let error = u16::from_le_bytes(events[8..10].try_into().unwrap());
    let nbytes = u64::from_le_bytes(events[16..24].try_into().unwrap());
    assert_eq!(userdata, 42);
    assert_eq!(error, 0);
    assert_eq!(nbytes, 3);
}

#[test]
fn zero_subscriptions_returns_zero_events_without_touching_memory() {
    let _guard = test_lock();
    {
        let mut state = wasi_vfs::global().lock();
        state.reset();
    }
    let mut nevents: u32 = 0xdead_beef;
    let rc = poll::wasi_vfs_poll_oneoff(std::ptr::null(), std::ptr::null_mut(), 0, &mut nevents as *mut u32 as *mut u8);
    assert_eq!(rc, 0);
    assert_eq!(nevents, 0);
}
