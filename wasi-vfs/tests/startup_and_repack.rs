//! Exercises the startup loader and the reactor-model `wasi_vfs_pack_fs`
//! re-pack entry point.

use std::sync::{Mutex, MutexGuard, OnceLock};

use byteorder::{LittleEndian, WriteBytesExt};

fn test_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

/// Hand-builds a one-mount packed image containing a single empty file, the
/// same octet format `vfs-mem` decodes.
fn one_file_image(mount_prefix: &[u8], file_name: &[u8], contents: &[u8]) -> Vec<u8> {
    let mut record = Vec::new();
    record.push(0u8); // DIR
    record.write_u32::<LittleEndian>(0).unwrap(); // root has no name
    record.write_u32::<LittleEndian>(1).unwrap(); // one entry
    record.push(1u8); // FILE
    record.write_u32::<LittleEndian>(file_name.len() as u32).unwrap();
    record.extend_from_slice(file_name);
    record.write_u64::<LittleEndian>(contents.len() as u64).unwrap();
    record.extend_from_slice(contents);

    let mut mount = Vec::new();
    mount.write_u32::<LittleEndian>(mount_prefix.len() as u32).unwrap();
    mount.extend_from_slice(mount_prefix);
    mount.extend_from_slice(&record);

    let mut image = Vec::new();
    image.write_u32::<LittleEndian>(mount.len() as u32).unwrap();
    image.extend_from_slice(&mount);
    image
}

#[test]
fn repack_tears_down_the_previous_mount_before_installing_the_new_one() {
    let _guard = test_lock();
    {
        let mut state = wasi_vfs::global().lock();
        state.reset();
    }

    let first = one_file_image(b"/", b"first.txt", b"one");
    unsafe {
        wasi_vfs::startup::wasi_vfs_pack_fs(first.as_ptr(), first.len() as u32);
    }
    {
        let state = wasi_vfs::global().lock();
        assert_eq!(state.preopens.len(), 1);
        let root = state.fs.mounts.mounts()[0].root;
        let root_node = state.fs.graph.link(root).unwrap().node;
        assert!(state.fs.graph.lookup_dirent(root_node, b"first.txt").unwrap().is_some());
    }

    let second = one_file_image(b"/", b"second.txt", b"two");
    unsafe {
        wasi_vfs::startup::wasi_vfs_pack_fs(second.as_ptr(), second.len() as u32);
    }
    let state = wasi_vfs::global().lock();
    assert_eq!(state.preopens.len(), 1, "repack must not accumulate stale preopens");
    let root = state.fs.mounts.mounts()[0].root;
    let root_node = state.fs.graph.link(root).unwrap().node;
    assert!(state.fs.graph.lookup_dirent(root_node, b"second.txt").unwrap().is_some());
    assert!(
        state.fs.graph.lookup_dirent(root_node, b"first.txt").unwrap().is_none(),
        "the previous mount's entries must not survive a repack"
    );
}

fn empty_dir_record() -> Vec<u8> {
    let mut record = Vec::new();
    record.push(0u8); // DIR
    record.write_u32::<LittleEndian>(0).unwrap();
    record.write_u32::<LittleEndian>(0).unwrap(); // no entries
    record
}

#[test]
fn preopens_are_registered_in_mount_table_order_with_their_guest_prefix() {
    let _guard = test_lock();
    {
        let mut state = wasi_vfs::global().lock();
        state.reset();
    }

    let mut image = Vec::new();
    let mut body = Vec::new();
    for prefix in [&b"/a"[..], &b"/b"[..]] {
        body.write_u32::<LittleEndian>(prefix.len() as u32).unwrap();
        body.extend_from_slice(prefix);
        body.extend_from_slice(&empty_dir_record());
    }
    image.write_u32::<LittleEndian>(body.len() as u32).unwrap();
    image.extend_from_slice(&body);

    unsafe {
        wasi_vfs::startup::wasi_vfs_pack_fs(image.as_ptr(), image.len() as u32);
    }

    let state = wasi_vfs::global().lock();
    assert_eq!(state.preopens.len(), 2);
    assert_eq!(state.preopens[0].1, b"/a");
    assert_eq!(state.preopens[1].1, b"/b");
}
