//! The host-ABI numeric error codes and the mapping from [`VfsErrorKind`]
//! onto them. Kept as a small `num_enum`-backed set rather than depending on
//! a generated WASI-types crate, the same call `vfs-core` already made for
//! its own `Rights` bitset.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use vfs_core::error::VfsErrorKind;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Errno {
    Success = 0,
    Badf = 8,
    Exist = 20,
    Inval = 28,
    Io = 29,
    Isdir = 31,
    Loop = 32,
    Noent = 44,
    Notdir = 54,
    Notempty = 55,
    Notsup = 58,
    Overflow = 61,
    Xdev = 75,
    Notcapable = 76,
}

/// Translates the core's internal error taxonomy into the numeric code an
/// interposed entry point returns to the guest.
pub fn vfs_error_kind_to_errno(kind: VfsErrorKind) -> Errno {
    match kind {
        VfsErrorKind::NotFound => Errno::Noent,
        VfsErrorKind::NotDir => Errno::Notdir,
        VfsErrorKind::IsDir => Errno::Isdir,
        VfsErrorKind::Exists => Errno::Exist,
        VfsErrorKind::Invalid => Errno::Inval,
        VfsErrorKind::NotCapable => Errno::Notcapable,
        VfsErrorKind::CrossDevice => Errno::Xdev,
        VfsErrorKind::Loop => Errno::Loop,
        VfsErrorKind::BufTooSmall => Errno::Overflow,
        VfsErrorKind::Unsupported => Errno::Notsup,
        VfsErrorKind::DirNotEmpty => Errno::Notempty,
        VfsErrorKind::BadHandle => Errno::Badf,
        VfsErrorKind::Io => Errno::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vfs_error_kind_has_a_stable_mapping() {
        let kinds = [
            VfsErrorKind::NotFound,
            VfsErrorKind::NotDir,
            VfsErrorKind::IsDir,
            VfsErrorKind::Exists,
            VfsErrorKind::Invalid,
            VfsErrorKind::NotCapable,
            VfsErrorKind::CrossDevice,
            VfsErrorKind::Loop,
            VfsErrorKind::BufTooSmall,
            VfsErrorKind::Unsupported,
            VfsErrorKind::DirNotEmpty,
            VfsErrorKind::BadHandle,
            VfsErrorKind::Io,
        ];
        for kind in kinds {
            let errno = vfs_error_kind_to_errno(kind);
            assert_ne!(u16::from(errno), 0, "{kind:?} must not map to Success");
        }
    }
}
