//! Host-ABI record layouts: marshals outputs into the caller's guest memory
//! according to the host ABI's record layouts. Since this crate links
//! directly into the `wasm32-wasip1` guest, these pointers are ordinary Rust
//! raw pointers into the *same* address space — there is no separate
//! host-side memory view to go through, unlike an embedder-side WASI
//! implementation.

use crate::errno::Errno;
use bitflags::bitflags;

pub type Fd = i32;
pub type Size = u32;
pub type Filesize = u64;
pub type Timestamp = u64;
pub type Dircookie = u64;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filetype {
    Unknown = 0,
    Directory = 3,
    RegularFile = 4,
    SymbolicLink = 7,
}

impl From<vfs_core::VfsFileType> for Filetype {
    fn from(t: vfs_core::VfsFileType) -> Self {
        match t {
            vfs_core::VfsFileType::RegularFile => Filetype::RegularFile,
            vfs_core::VfsFileType::Directory => Filetype::Directory,
            vfs_core::VfsFileType::Symlink => Filetype::SymbolicLink,
        }
    }
}

bitflags! {
    pub struct Fdflags: u16 {
        const APPEND   = 1 << 0;
        const NONBLOCK = 1 << 1;
        const SYNC     = 1 << 4;
    }
}

bitflags! {
    pub struct Oflags: u16 {
        const CREAT     = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCL      = 1 << 2;
        const TRUNC     = 1 << 3;
    }
}

bitflags! {
    pub struct Lookupflags: u32 {
        const SYMLINK_FOLLOW = 1 << 0;
    }
}

bitflags! {
    pub struct Fstflags: u16 {
        const ATIM      = 1 << 0;
        const ATIM_NOW  = 1 << 1;
        const MTIM      = 1 << 2;
        const MTIM_NOW  = 1 << 3;
    }
}

/// Mirrors `__wasi_fdstat_t`: 24 bytes, 8-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Fdstat {
    pub fs_filetype: u8,
    _pad0: [u8; 1],
    pub fs_flags: u16,
    _pad1: [u8; 4],
    pub fs_rights_base: u64,
    pub fs_rights_inheriting: u64,
}

impl Fdstat {
    pub fn new(filetype: Filetype, flags: Fdflags, rights_base: u64, rights_inheriting: u64) -> Self {
        Self {
            fs_filetype: filetype as u8,
            _pad0: [0],
            fs_flags: flags.bits(),
            _pad1: [0; 4],
            fs_rights_base: rights_base,
            fs_rights_inheriting: rights_inheriting,
        }
    }
}

/// Mirrors `__wasi_filestat_t`: 64 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Filestat {
    pub dev: u64,
    pub ino: u64,
    pub filetype: u8,
    _pad: [u8; 7],
    pub nlink: u64,
    pub size: u64,
    pub atim: u64,
    pub mtim: u64,
    pub ctim: u64,
}

impl Filestat {
    pub fn new(ino: u64, filetype: Filetype, nlink: u64, size: u64) -> Self {
        Self {
            dev: 0,
            ino,
            filetype: filetype as u8,
            _pad: [0; 7],
            nlink,
            size,
            atim: 0,
            mtim: 0,
            ctim: 0,
        }
    }
}

/// Mirrors `__wasi_dirent_t`: 24 bytes, followed in the wire stream by
/// `d_namlen` raw name bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WireDirent {
    pub d_next: Dircookie,
    pub d_ino: u64,
    pub d_namlen: u32,
    pub d_type: u8,
    _pad: [u8; 3],
}

impl WireDirent {
    pub fn new(next: Dircookie, ino: u64, namlen: u32, file_type: Filetype) -> Self {
        Self {
            d_next: next,
            d_ino: ino,
            d_namlen: namlen,
            d_type: file_type as u8,
            _pad: [0; 3],
        }
    }

    /// Copies this record's raw bytes (but not the trailing name) into
    /// `out`, returning how many bytes were written.
    pub fn write_header(&self, out: &mut [u8]) -> usize {
        let bytes = unsafe {
            std::slice::from_raw_parts(
                (self as *const Self) as *const u8,
                std::mem::size_of::<Self>(),
            )
        };
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        n
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Ciovec {
    pub buf: *const u8,
    pub buf_len: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Iovec {
    pub buf: *mut u8,
    pub buf_len: u32,
}

/// The "dir" preopen record; our preopens are always directories, so the
/// tag byte is implicit.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PrestatDir {
    pub pr_name_len: u32,
}

pub const fn errno_ok() -> Errno {
    Errno::Success
}
