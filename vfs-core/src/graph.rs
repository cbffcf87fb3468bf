//! The inode/link graph — an arena of [`Node`]s, an arena of
//! [`Link`]s, and the handful of mutating operations the image loader and
//! the interposition layer build everything else on top of.

use crate::arena::Arena;
use crate::error::{VfsError, VfsErrorKind, VfsResult};
use crate::link::{Link, LinkId};
use crate::name::VfsName;
use crate::node::{Dirent, Node, NodeId, NodeKind, ReadDirBatch};

pub struct InodeGraph {
    nodes: Arena<Node>,
    links: Arena<Link>,
}

impl Default for InodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeGraph {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            links: Arena::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> VfsResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "graph.node"))
    }

    fn node_mut(&mut self, id: NodeId) -> VfsResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "graph.node_mut"))
    }

    pub fn link(&self, id: LinkId) -> VfsResult<&Link> {
        self.links
            .get(id)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "graph.link"))
    }

    /// A preopened root directory: a link with no parent and a fresh,
    /// empty directory node.
    pub fn new_preopen_dir(&mut self) -> LinkId {
        let node = self.nodes.insert(Node::new_dir());
        self.links.insert(Link::new(None, node))
    }

    /// Creates a directory node, links it as `name` under `parent`, and
    /// returns the new link — whose `parent` field is `parent` itself, so
    /// `..` from it returns here.
    pub fn new_dir(&mut self, parent: LinkId, name: VfsName) -> VfsResult<LinkId> {
        let parent_node = self.link(parent)?.node;
        let node = self.nodes.insert(Node::new_dir());
        let link = self.links.insert(Link::new(Some(parent), node));
        self.insert_dirent(parent_node, name, link)?;
        Ok(link)
    }

    pub fn new_file(&mut self, parent: LinkId, name: VfsName, bytes: Vec<u8>) -> VfsResult<LinkId> {
        let parent_node = self.link(parent)?.node;
        let node = self.nodes.insert(Node::new_file(bytes));
        let link = self.links.insert(Link::new(Some(parent), node));
        self.insert_dirent(parent_node, name, link)?;
        Ok(link)
    }

    pub fn new_symlink(
        &mut self,
        parent: LinkId,
        name: VfsName,
        target: Vec<u8>,
    ) -> VfsResult<LinkId> {
        let parent_node = self.link(parent)?.node;
        let node = self.nodes.insert(Node::new_symlink(target));
        let link = self.links.insert(Link::new(Some(parent), node));
        self.insert_dirent(parent_node, name, link)?;
        Ok(link)
    }

    /// Hard-links `existing`'s node into `parent` under a new name. A fresh
    /// [`Link`] is allocated (sharing the node with `existing`) so its
    /// `parent` field is *this* parent, not whatever `existing`'s parent is
    /// Distinct hard links to the same node resolve `..` through their own parent.
    pub fn hard_link(&mut self, existing: LinkId, parent: LinkId, name: VfsName) -> VfsResult<LinkId> {
        let node = self.link(existing)?.node;
        if self.node(node)?.is_dir() {
            return Err(VfsError::new(VfsErrorKind::IsDir, "hard_link.is_dir"));
        }
        let parent_node = self.link(parent)?.node;
        let new_link = self.links.insert(Link::new(Some(parent), node));
        self.insert_dirent(parent_node, name, new_link)?;
        self.node_mut(node)?.nlink += 1;
        Ok(new_link)
    }

    pub fn insert_dirent(&mut self, dir_node: NodeId, name: VfsName, link: LinkId) -> VfsResult<()> {
        match &mut self.node_mut(dir_node)?.kind {
            NodeKind::Directory { entries } => {
                if entries.contains_key(name.as_bytes()) {
                    return Err(VfsError::new(VfsErrorKind::Exists, "insert_dirent.exists"));
                }
                entries.insert(name, link);
                Ok(())
            }
            NodeKind::File { .. } => Err(VfsError::new(VfsErrorKind::NotDir, "insert_dirent.not_dir")),
        }
    }

    pub fn remove_dirent(&mut self, dir_node: NodeId, name: &[u8]) -> VfsResult<LinkId> {
        match &mut self.node_mut(dir_node)?.kind {
            NodeKind::Directory { entries } => entries
                .remove(name)
                .ok_or_else(|| VfsError::new(VfsErrorKind::NotFound, "remove_dirent.not_found")),
            NodeKind::File { .. } => Err(VfsError::new(VfsErrorKind::NotDir, "remove_dirent.not_dir")),
        }
    }

    pub fn lookup_dirent(&self, dir_node: NodeId, name: &[u8]) -> VfsResult<Option<LinkId>> {
        match &self.node(dir_node)?.kind {
            NodeKind::Directory { entries } => Ok(entries.get(name).copied()),
            NodeKind::File { .. } => Err(VfsError::new(VfsErrorKind::NotDir, "lookup_dirent.not_dir")),
        }
    }

    /// Destroys the link at `link_id` (and its node, if this was the node's
    /// last link) after the caller has already removed the corresponding
    /// dirent. Directories must be empty.
    pub fn destroy_link(&mut self, link_id: LinkId) -> VfsResult<()> {
        let link = self
            .links
            .remove(link_id)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "destroy_link.missing"))?;
        let node = self
            .nodes
            .get_mut(link.node)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "destroy_link.node_missing"))?;
        node.nlink -= 1;
        self.reap_if_unreferenced(link.node);
        Ok(())
    }

    pub fn nlink(&self, node: NodeId) -> VfsResult<u32> {
        Ok(self.node(node)?.nlink)
    }

    /// Registers an open-file description against `node`, keeping it alive
    /// even if every directory entry naming it is removed before the
    /// description is closed.
    pub fn retain_open(&mut self, node: NodeId) -> VfsResult<()> {
        self.node_mut(node)?.open_count += 1;
        Ok(())
    }

    /// Releases an open-file description's hold on `node`, reaping it if
    /// it has also lost its last directory entry in the meantime.
    pub fn release_open(&mut self, node: NodeId) -> VfsResult<()> {
        self.node_mut(node)?.open_count -= 1;
        self.reap_if_unreferenced(node);
        Ok(())
    }

    fn reap_if_unreferenced(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get(node) {
            if n.nlink == 0 && n.open_count == 0 {
                self.nodes.remove(node);
            }
        }
    }

    /// Unlinks a non-directory entry, destroying its link (and node, once
    /// unreferenced). Fails with `IsDir` if `name` names a directory.
    pub fn unlink(&mut self, dir_node: NodeId, name: &[u8]) -> VfsResult<()> {
        let link_id = self.lookup_dirent(dir_node, name)?.ok_or_else(|| {
            VfsError::new(VfsErrorKind::NotFound, "unlink.not_found")
        })?;
        let target_node = self.link(link_id)?.node;
        if self.node(target_node)?.is_dir() {
            return Err(VfsError::new(VfsErrorKind::IsDir, "unlink.is_dir"));
        }
        self.remove_dirent(dir_node, name)?;
        self.destroy_link(link_id)
    }

    /// Removes an empty directory entry.
    pub fn rmdir(&mut self, dir_node: NodeId, name: &[u8]) -> VfsResult<()> {
        let link_id = self.lookup_dirent(dir_node, name)?.ok_or_else(|| {
            VfsError::new(VfsErrorKind::NotFound, "rmdir.not_found")
        })?;
        let target_node = self.link(link_id)?.node;
        self.rmdir_check_empty(target_node)?;
        self.remove_dirent(dir_node, name)?;
        self.destroy_link(link_id)
    }

    /// Rewires a directory entry to a new `(parent, name)` without touching
    /// the underlying node. If an entry already
    /// exists at the destination it is replaced.
    pub fn rename(
        &mut self,
        old_parent: NodeId,
        old_name: &[u8],
        new_parent_link: LinkId,
        new_parent: NodeId,
        new_name: VfsName,
    ) -> VfsResult<()> {
        if let Some(existing) = self.lookup_dirent(new_parent, new_name.as_bytes())? {
            self.remove_dirent(new_parent, new_name.as_bytes())?;
            self.destroy_link(existing)?;
        }
        let link_id = self
            .lookup_dirent(old_parent, old_name)?
            .ok_or_else(|| VfsError::new(VfsErrorKind::NotFound, "rename.not_found"))?;
        self.remove_dirent(old_parent, old_name)?;
        self.links
            .get_mut(link_id)
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, "rename.link_missing"))?
            .parent = Some(new_parent_link);
        self.insert_dirent(new_parent, new_name, link_id)
    }

    pub fn rmdir_check_empty(&self, dir_node: NodeId) -> VfsResult<()> {
        match &self.node(dir_node)?.kind {
            NodeKind::Directory { entries } if entries.is_empty() => Ok(()),
            NodeKind::Directory { .. } => {
                Err(VfsError::new(VfsErrorKind::DirNotEmpty, "rmdir.not_empty"))
            }
            NodeKind::File { .. } => Err(VfsError::new(VfsErrorKind::NotDir, "rmdir.not_dir")),
        }
    }

    pub fn readlink(&self, node: NodeId) -> VfsResult<Vec<u8>> {
        match &self.node(node)?.kind {
            NodeKind::File { bytes, symlink: true } => Ok(bytes.clone()),
            _ => Err(VfsError::new(VfsErrorKind::Invalid, "readlink.not_symlink")),
        }
    }

    pub fn file_len(&self, node: NodeId) -> VfsResult<u64> {
        match &self.node(node)?.kind {
            NodeKind::File { bytes, .. } => Ok(bytes.len() as u64),
            NodeKind::Directory { .. } => Err(VfsError::new(VfsErrorKind::IsDir, "file_len.is_dir")),
        }
    }

    pub fn read_at(&self, node: NodeId, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        match &self.node(node)?.kind {
            NodeKind::File { bytes, .. } => {
                let start = offset as usize;
                if start >= bytes.len() {
                    return Ok(0);
                }
                let end = usize::min(bytes.len(), start + buf.len());
                let count = end - start;
                buf[..count].copy_from_slice(&bytes[start..end]);
                Ok(count)
            }
            NodeKind::Directory { .. } => Err(VfsError::new(VfsErrorKind::IsDir, "read_at.is_dir")),
        }
    }

    /// Writes `buf` at `offset`, zero-padding any gap between the current
    /// end-of-file and `offset`.
    pub fn write_at(&mut self, node: NodeId, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::File { bytes, .. } => {
                let start = offset as usize;
                if start > bytes.len() {
                    bytes.resize(start, 0);
                }
                let end = start + buf.len();
                if end > bytes.len() {
                    bytes.resize(end, 0);
                }
                bytes[start..end].copy_from_slice(buf);
                Ok(buf.len())
            }
            NodeKind::Directory { .. } => Err(VfsError::new(VfsErrorKind::IsDir, "write_at.is_dir")),
        }
    }

    pub fn set_len(&mut self, node: NodeId, len: u64) -> VfsResult<()> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::File { bytes, .. } => {
                bytes.resize(len as usize, 0);
                Ok(())
            }
            NodeKind::Directory { .. } => Err(VfsError::new(VfsErrorKind::IsDir, "set_len.is_dir")),
        }
    }

    /// Lists up to `max_entries` starting after `cookie` (cookie `0` is
    /// start-of-stream), in the directory's stable snapshot order.
    pub fn read_dir(&self, dir_node: NodeId, cookie: u64, max_entries: usize) -> VfsResult<ReadDirBatch> {
        match &self.node(dir_node)?.kind {
            NodeKind::Directory { entries } => {
                let skip = cookie as usize;
                let mut out = Vec::new();
                let mut index = 0u64;
                for (name, link) in entries.iter() {
                    index += 1;
                    if (index as usize) <= skip {
                        continue;
                    }
                    if out.len() >= max_entries {
                        break;
                    }
                    let entry_node_id = self.link(*link)?.node;
                    let entry_node = self.node(entry_node_id)?;
                    out.push(Dirent {
                        name: name.clone(),
                        link: *link,
                        file_type: entry_node.file_type(),
                        next_cookie: index,
                    });
                }
                let emitted = out.len();
                let next = if skip + emitted < entries.len() {
                    Some((skip + emitted) as u64)
                } else {
                    None
                };
                Ok(ReadDirBatch { entries: out, next })
            }
            NodeKind::File { .. } => Err(VfsError::new(VfsErrorKind::NotDir, "read_dir.not_dir")),
        }
    }
}

impl InodeGraph {
    pub fn link_node_id(&self, link: LinkId) -> VfsResult<NodeId> {
        Ok(self.link(link)?.node)
    }
}
