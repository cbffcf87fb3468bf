//! The path resolver: walks a path string from a base link,
//! honoring `.`, `..`, repeated slashes, and bounded symlink expansion.

use crate::error::{VfsError, VfsErrorKind, VfsResult};
use crate::graph::InodeGraph;
use crate::link::LinkId;

/// Borrowed path bytes, as handed in from the interposition layer. Not
/// required to be valid UTF-8.
#[derive(Clone, Copy)]
pub struct VfsPath<'a>(&'a [u8]);

impl<'a> VfsPath<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Where relative lookups and absolute lookups begin, respectively.
pub struct ResolveContext {
    /// The preopen/mount root an absolute path resolves from.
    pub root: LinkId,
    /// The base descriptor's link a relative path resolves from.
    pub base: LinkId,
    pub follow_final_symlink: bool,
    pub symlink_hop_bound: usize,
}

/// Resolves `path` starting at `ctx.base` (or `ctx.root` if absolute),
/// returning the link the path names.
pub fn resolve(graph: &InodeGraph, ctx: &ResolveContext, path: &[u8]) -> VfsResult<LinkId> {
    let mut current = if path.first() == Some(&b'/') {
        ctx.root
    } else {
        ctx.base
    };
    let mut stack: Vec<Vec<u8>> = vec![path.to_vec()];
    let mut hops = 0usize;

    loop {
        let segment = match stack.last_mut() {
            Some(segment) => segment,
            None => return Ok(current),
        };
        while segment.first() == Some(&b'/') {
            segment.remove(0);
        }
        if segment.is_empty() {
            stack.pop();
            continue;
        }

        let slash_pos = segment.iter().position(|&b| b == b'/');
        let component: Vec<u8> = match slash_pos {
            Some(pos) => segment.drain(..pos).collect(),
            None => std::mem::take(segment),
        };
        let had_slash = slash_pos.is_some();
        while segment.first() == Some(&b'/') {
            segment.remove(0);
        }
        let is_final = stack.len() == 1 && segment.is_empty();
        let trailing_slash = had_slash && is_final;

        let current_node = graph.link(current)?.node;
        if !graph.node(current_node)?.is_dir() {
            return Err(VfsError::new(VfsErrorKind::NotDir, "resolve.component_not_dir"));
        }

        if component == b"." {
            continue;
        }

        if component == b".." {
            // At the root, `..` is a no-op rather than an
            // escape (matches the host ABI's sandbox rule).
            current = graph.link(current)?.parent.unwrap_or(current);
            continue;
        }

        let found = graph
            .lookup_dirent(current_node, &component)?
            .ok_or_else(|| VfsError::new(VfsErrorKind::NotFound, "resolve.lookup"))?;
        let found_node_id = graph.link(found)?.node;
        let found_node = graph.node(found_node_id)?;

        if found_node.is_symlink() && (!is_final || ctx.follow_final_symlink) {
            hops += 1;
            if hops > ctx.symlink_hop_bound {
                return Err(VfsError::new(VfsErrorKind::Loop, "resolve.symlink_loop"));
            }
            let target = graph.readlink(found_node_id)?;
            current = if target.first() == Some(&b'/') {
                ctx.root
            } else {
                graph.link(found)?.parent.unwrap_or(current)
            };
            stack.push(target);
            continue;
        }

        if trailing_slash && !found_node.is_dir() {
            return Err(VfsError::new(VfsErrorKind::NotDir, "resolve.trailing_slash"));
        }

        current = found;
    }
}

/// Default bound on symlink-expansion hops ("the bound is ≥ 32").
pub const DEFAULT_SYMLINK_HOP_BOUND: usize = 32;
