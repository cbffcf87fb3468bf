//! `poll_oneoff`: VFS descriptors are always ready, so a poll made up
//! entirely of VFS readiness subscriptions is answered immediately without
//! touching the host. A poll made up entirely of clock subscriptions is
//! forwarded to the host verbatim. Mixing VFS-backed and host-backed
//! descriptor subscriptions in the same call is not supported — there is no
//! combined host+VFS readiness multiplexing here.

use crate::errno::Errno;
use crate::host_abi;
use crate::openfile::OpenFile;
use crate::state::global;

use super::{errno_to_i32, ok};

const SUBSCRIPTION_SIZE: usize = 48;
const EVENT_SIZE: usize = 32;

const EVENTTYPE_CLOCK: u8 = 0;
const EVENTTYPE_FD_READ: u8 = 1;
const EVENTTYPE_FD_WRITE: u8 = 2;

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSubscription {
    userdata: u64,
    tag: u8,
}

unsafe fn read_subscription(ptr: *const u8, index: i32) -> RawSubscription {
    let base = ptr.add(index as usize * SUBSCRIPTION_SIZE);
    let userdata = u64::from_le_bytes(std::slice::from_raw_parts(base, 8).try_into().unwrap());
    let tag = *base.add(8);
    RawSubscription { userdata, tag }
}

unsafe fn read_subscription_fd(ptr: *const u8, index: i32) -> i32 {
    let base = ptr.add(index as usize * SUBSCRIPTION_SIZE);
    // The `fd_readwrite` union variant starts at offset 16 with the
    // descriptor as its first field.
    i32::from_le_bytes(std::slice::from_raw_parts(base.add(16), 4).try_into().unwrap())
}

unsafe fn write_event(ptr: *mut u8, index: i32, userdata: u64, error: Errno, eventtype: u8, nbytes: u64) {
    let base = ptr.add(index as usize * EVENT_SIZE);
    std::ptr::write_bytes(base, 0, EVENT_SIZE);
    std::ptr::copy_nonoverlapping(userdata.to_le_bytes().as_ptr(), base, 8);
    let errno_bytes = (u16::from(error)).to_le_bytes();
    std::ptr::copy_nonoverlapping(errno_bytes.as_ptr(), base.add(8), 2);
    *base.add(10) = eventtype;
    std::ptr::copy_nonoverlapping(nbytes.to_le_bytes().as_ptr(), base.add(16), 8);
}

#[no_mangle]
pub extern "C" fn wasi_vfs_poll_oneoff(in_: *const u8, out: *mut u8, nsubscriptions: i32, nevents: *mut u8) -> i32 {
    if nsubscriptions <= 0 {
        unsafe { super::write_out(nevents, 0u32) };
        return ok();
    }

    let subs: Vec<RawSubscription> = (0..nsubscriptions)
        .map(|i| unsafe { read_subscription(in_, i) })
        .collect();

    let all_clock = subs.iter().all(|s| s.tag == EVENTTYPE_CLOCK);
    let all_fd = subs
        .iter()
        .all(|s| s.tag == EVENTTYPE_FD_READ || s.tag == EVENTTYPE_FD_WRITE);

    if !all_clock && !all_fd {
        return errno_to_i32(Errno::Inval);
    }

    if all_clock {
        return unsafe { host_abi::poll_oneoff(in_ as i32, out as i32, nsubscriptions, nevents as i32) };
    }

    let state = global().lock();
    let fds: Vec<i32> = (0..nsubscriptions)
        .map(|i| unsafe { read_subscription_fd(in_, i) })
        .collect();
    let mut any_host = false;
    let mut any_vfs = false;
    for &fd in &fds {
        match state.fds.get(fd) {
            Ok(OpenFile::VfsOpen { .. }) => any_vfs = true,
            Ok(OpenFile::HostPassthrough { .. }) => any_host = true,
            Err(_) => return errno_to_i32(Errno::Badf),
        }
    }

    if any_host && any_vfs {
        return errno_to_i32(Errno::Notsup);
    }

    if any_host {
        drop(state);
        return unsafe { host_abi::poll_oneoff(in_ as i32, out as i32, nsubscriptions, nevents as i32) };
    }

    for (i, sub) in subs.iter().enumerate() {
        let node = match state.fds.get(fds[i]) {
            Ok(OpenFile::VfsOpen { node, .. }) => *node,
            _ => return errno_to_i32(Errno::Badf),
        };
        let nbytes = if sub.tag == EVENTTYPE_FD_READ {
            state.fs.graph.file_len(node).unwrap_or(0)
        } else {
            0
        };
        unsafe { write_event(out, i as i32, sub.userdata, Errno::Success, sub.tag, nbytes) };
    }
    unsafe { super::write_out(nevents, nsubscriptions as u32) };
    ok()
}
