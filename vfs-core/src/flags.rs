//! Bit-flag vocabulary shared by the resolver, the open-file state, and the
//! interposition layer's rights checks.

use bitflags::bitflags;

bitflags! {
    /// Flags passed to `path_open`-style operations.
    pub struct OpenFlags: u32 {
        const READ      = 0b0000_0001;
        const WRITE     = 0b0000_0010;
        const CREATE    = 0b0000_0100;
        const EXCLUSIVE = 0b0000_1000;
        const TRUNCATE  = 0b0001_0000;
        const DIRECTORY = 0b0010_0000;
        const APPEND    = 0b0100_0000;
    }
}

bitflags! {
    /// Controls whether the final path component's symlink (if any) is
    /// followed, and whether `..` is allowed to cross a mount boundary on
    /// its way up (it never is).
    pub struct ResolveFlags: u32 {
        const NO_FOLLOW = 0b0000_0001;
    }
}

bitflags! {
    /// Effective rights recorded on an open-file description.
    /// Mirrors the WASI preview-1 `rights` bitset closely enough that the
    /// interposition layer's conversion is a 1:1 field copy, without
    /// depending on a generated WASI-types crate here in `vfs-core`.
    pub struct Rights: u64 {
        const FD_READ             = 1 << 0;
        const FD_SEEK             = 1 << 1;
        const FD_WRITE             = 1 << 2;
        const FD_TELL              = 1 << 3;
        const FD_READDIR           = 1 << 4;
        const FD_FILESTAT_GET      = 1 << 5;
        const FD_FILESTAT_SET_SIZE = 1 << 6;
        const FD_FILESTAT_SET_TIMES= 1 << 7;
        const PATH_CREATE_DIRECTORY= 1 << 8;
        const PATH_CREATE_FILE     = 1 << 9;
        const PATH_LINK_SOURCE     = 1 << 10;
        const PATH_LINK_TARGET     = 1 << 11;
        const PATH_OPEN            = 1 << 12;
        const PATH_READLINK        = 1 << 13;
        const PATH_RENAME_SOURCE   = 1 << 14;
        const PATH_RENAME_TARGET   = 1 << 15;
        const PATH_FILESTAT_GET    = 1 << 16;
        const PATH_FILESTAT_SET_TIMES = 1 << 17;
        const PATH_SYMLINK         = 1 << 18;
        const PATH_REMOVE_DIRECTORY= 1 << 19;
        const PATH_UNLINK_FILE     = 1 << 20;
        const POLL_FD_READWRITE    = 1 << 21;
    }
}

impl OpenFlags {
    pub fn wants_dir(self) -> bool {
        self.contains(OpenFlags::DIRECTORY)
    }
}
