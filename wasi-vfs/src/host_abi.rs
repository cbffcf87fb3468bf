//! Raw imports of the real `wasi_snapshot_preview1` host ABI, used to
//! forward calls on descriptors classified as
//! [`crate::openfile::OpenFile::HostPassthrough`].
//!
//! These are genuinely the host's own functions, imported under their
//! original names — the trampoline's weak wrappers call our `wasi_vfs_*`
//! exports instead of these, so forwarding has to happen explicitly here
//! rather than falling out of linker aliasing.
#[link(wasm_import_module = "wasi_snapshot_preview1")]
extern "C" {
    pub fn fd_advise(fd: i32, offset: i64, len: i64, advice: i32) -> i32;
    pub fn fd_allocate(fd: i32, offset: i64, len: i64) -> i32;
    pub fn fd_close(fd: i32) -> i32;
    pub fn fd_datasync(fd: i32) -> i32;
    pub fn fd_fdstat_get(fd: i32, buf: i32) -> i32;
    pub fn fd_fdstat_set_flags(fd: i32, flags: i32) -> i32;
    pub fn fd_fdstat_set_rights(fd: i32, rights_base: i64, rights_inheriting: i64) -> i32;
    pub fn fd_filestat_get(fd: i32, buf: i32) -> i32;
    pub fn fd_filestat_set_size(fd: i32, size: i64) -> i32;
    pub fn fd_filestat_set_times(fd: i32, atim: i64, mtim: i64, fst_flags: i32) -> i32;
    pub fn fd_pread(fd: i32, iovs: i32, iovs_len: i32, offset: i64, nread: i32) -> i32;
    pub fn fd_prestat_get(fd: i32, buf: i32) -> i32;
    pub fn fd_prestat_dir_name(fd: i32, path: i32, path_len: i32) -> i32;
    pub fn fd_pwrite(fd: i32, iovs: i32, iovs_len: i32, offset: i64, nwritten: i32) -> i32;
    pub fn fd_read(fd: i32, iovs: i32, iovs_len: i32, nread: i32) -> i32;
    pub fn fd_readdir(fd: i32, buf: i32, buf_len: i32, cookie: i64, bufused: i32) -> i32;
    pub fn fd_renumber(fd: i32, to: i32) -> i32;
    pub fn fd_seek(fd: i32, offset: i64, whence: i32, newoffset: i32) -> i32;
    pub fn fd_sync(fd: i32) -> i32;
    pub fn fd_tell(fd: i32, offset: i32) -> i32;
    pub fn fd_write(fd: i32, iovs: i32, iovs_len: i32, nwritten: i32) -> i32;
    pub fn path_create_directory(fd: i32, path: i32, path_len: i32) -> i32;
    pub fn path_filestat_get(fd: i32, flags: i32, path: i32, path_len: i32, buf: i32) -> i32;
    pub fn path_filestat_set_times(
        fd: i32,
        flags: i32,
        path: i32,
        path_len: i32,
        atim: i64,
        mtim: i64,
        fst_flags: i32,
    ) -> i32;
    pub fn path_link(
        old_fd: i32,
        old_flags: i32,
        old_path: i32,
        old_path_len: i32,
        new_fd: i32,
        new_path: i32,
        new_path_len: i32,
    ) -> i32;
    pub fn path_open(
        fd: i32,
        dirflags: i32,
        path: i32,
        path_len: i32,
        oflags: i32,
        fs_rights_base: i64,
        fs_rights_inheriting: i64,
        fdflags: i32,
        opened_fd: i32,
    ) -> i32;
    pub fn path_readlink(
        fd: i32,
        path: i32,
        path_len: i32,
        buf: i32,
        buf_len: i32,
        bufused: i32,
    ) -> i32;
    pub fn path_remove_directory(fd: i32, path: i32, path_len: i32) -> i32;
    pub fn path_rename(
        fd: i32,
        old_path: i32,
        old_path_len: i32,
        new_fd: i32,
        new_path: i32,
        new_path_len: i32,
    ) -> i32;
    pub fn path_symlink(old_path: i32, old_path_len: i32, fd: i32, new_path: i32, new_path_len: i32) -> i32;
    pub fn path_unlink_file(fd: i32, path: i32, path_len: i32) -> i32;
    pub fn poll_oneoff(in_: i32, out: i32, nsubscriptions: i32, nevents: i32) -> i32;
}
