//! The mount table: an ordered, immutable-after-startup set of
//! `(guest_prefix -> root_link)` bindings with deterministic longest-prefix
//! match honoring `/` component boundaries.

use crate::error::{VfsError, VfsErrorKind, VfsResult};
use crate::link::LinkId;

pub struct Mount {
    pub prefix: Vec<u8>,
    pub root: LinkId,
    /// Whether this mount shadows a host-ABI preopen at the same prefix
    /// Set when a VFS mount shadows a host-ABI preopen at the same prefix.
    pub shadows_host_preopen: bool,
}

#[derive(Default)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mount. `prefix` must be absolute and carry no trailing
    /// slash (except the root mount `/` itself). Mount prefixes are unique
    /// Mount prefixes are unique; the longest match wins during resolution.
    pub fn add_mount(
        &mut self,
        prefix: Vec<u8>,
        root: LinkId,
        shadows_host_preopen: bool,
    ) -> VfsResult<()> {
        if prefix.first() != Some(&b'/') {
            return Err(VfsError::new(VfsErrorKind::Invalid, "mount.not_absolute"));
        }
        if prefix.len() > 1 && prefix.last() == Some(&b'/') {
            return Err(VfsError::new(VfsErrorKind::Invalid, "mount.trailing_slash"));
        }
        if self.mounts.iter().any(|m| m.prefix == prefix) {
            return Err(VfsError::new(VfsErrorKind::Exists, "mount.duplicate_prefix"));
        }
        self.mounts.push(Mount {
            prefix,
            root,
            shadows_host_preopen,
        });
        Ok(())
    }

    /// Longest-prefix match over registered mounts. Returns the matching
    /// mount and the path remainder (including its leading slash, if any)
    /// to resolve from the mount's root.
    pub fn resolve_mount<'a>(&self, path: &'a [u8]) -> Option<(&Mount, &'a [u8])> {
        let mut best: Option<&Mount> = None;
        for mount in &self.mounts {
            if prefix_matches(path, &mount.prefix)
                && best.is_none_or(|b| mount.prefix.len() > b.prefix.len())
            {
                best = Some(mount);
            }
        }
        best.map(|mount| (mount, &path[mount.prefix.len()..]))
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }
}

/// `/mnt` matches `/mnt` and `/mnt/x` but not `/mntx`.
fn prefix_matches(path: &[u8], prefix: &[u8]) -> bool {
    if prefix == b"/" {
        return path.first() == Some(&b'/');
    }
    if !path.starts_with(prefix) {
        return false;
    }
    matches!(path.get(prefix.len()), None | Some(&b'/'))
}

trait IsNoneOr<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool;
}

impl<T> IsNoneOr<T> for Option<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool {
        match self {
            Some(v) => f(v),
            None => true,
        }
    }
}
