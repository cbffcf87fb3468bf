//! The file description table: an integer-indexed table mapping a
//! host-facing descriptor number to an [`OpenFile`], with dense
//! allocation/recycling and a reserved low band for stdio.

use vfs_core::error::{VfsError, VfsErrorKind, VfsResult};

use crate::abi::Fd;
use crate::openfile::OpenFile;

pub struct FdTable {
    slots: Vec<Option<OpenFile>>,
    /// Indices below `reserved_band` are never handed out by `insert`; they
    /// start out wired to host stdio and are only ever touched by
    /// `renumber`.
    reserved_band: u32,
    /// Freed slot indices, reused before the table grows.
    free: Vec<Fd>,
}

impl FdTable {
    /// `reserved_band` low descriptors (stdin/stdout/stderr by convention)
    /// start out as host passthroughs onto the same-numbered host fd.
    pub fn new(reserved_band: u32) -> Self {
        let slots = (0..reserved_band)
            .map(|fd| {
                Some(OpenFile::HostPassthrough {
                    host_fd: fd as Fd,
                    is_preopen_dir: false,
                    preopen_prefix: None,
                })
            })
            .collect();
        Self {
            slots,
            reserved_band,
            free: Vec::new(),
        }
    }

    pub fn get(&self, fd: Fd) -> VfsResult<&OpenFile> {
        self.slots
            .get(fd as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "fdtable.get"))
    }

    pub fn get_mut(&mut self, fd: Fd) -> VfsResult<&mut OpenFile> {
        self.slots
            .get_mut(fd as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "fdtable.get_mut"))
    }

    /// Allocates the lowest-numbered free slot at or above the reserved
    /// band, reusing a recycled index when one is available.
    pub fn insert(&mut self, file: OpenFile) -> Fd {
        if let Some(fd) = self.free.pop() {
            self.slots[fd as usize] = Some(file);
            return fd;
        }
        let fd = self.slots.len() as Fd;
        self.slots.push(Some(file));
        fd
    }

    /// Registers a VFS preopen directly at `fd`, growing the table if
    /// necessary. Used only by the startup loader, which assigns preopen
    /// numbers itself rather than taking whatever `insert` hands out, so
    /// the host ABI's own preopen-populator sees them already in place.
    pub fn insert_at(&mut self, fd: Fd, file: OpenFile) -> VfsResult<()> {
        let idx = fd as usize;
        if idx < self.slots.len() {
            if self.slots[idx].is_some() {
                return Err(VfsError::new(VfsErrorKind::Exists, "fdtable.insert_at.occupied"));
            }
            self.slots[idx] = Some(file);
        } else {
            self.slots.resize_with(idx, || None);
            self.slots.push(Some(file));
        }
        Ok(())
    }

    pub fn close(&mut self, fd: Fd) -> VfsResult<OpenFile> {
        let idx = fd as usize;
        let slot = self
            .slots
            .get_mut(idx)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "fdtable.close"))?;
        let file = slot
            .take()
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "fdtable.close.empty"))?;
        if idx as u32 >= self.reserved_band {
            self.free.push(fd);
        }
        Ok(file)
    }

    /// Atomically moves whatever occupies `from` into `to`, closing
    /// whatever previously occupied `to`.
    pub fn renumber(&mut self, from: Fd, to: Fd) -> VfsResult<()> {
        if from == to {
            return self.get(from).map(|_| ());
        }
        let moved = self.close(from)?;
        if (to as usize) < self.slots.len() && self.slots[to as usize].is_some() {
            let _ = self.close(to)?;
        }
        self.insert_at(to, moved)
    }

    pub fn reserved_band(&self) -> u32 {
        self.reserved_band
    }
}
