//! `vfs-mem`: a thin façade over [`vfs_core`]'s in-memory inode graph, plus
//! the packed-image codec described in the host-ABI surface ("Packed image
//! format"). There is no backend-selection machinery here — one graph, one
//! mount table, built and torn down in one guest instance.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use tracing::trace;
use vfs_core::error::{VfsError, VfsErrorKind, VfsResult};
use vfs_core::graph::InodeGraph;
use vfs_core::link::LinkId;
use vfs_core::mount::MountTable;
use vfs_core::name::VfsName;
use vfs_core::node::{NodeId, NodeKind};

const KIND_DIR: u8 = 0;
const KIND_FILE: u8 = 1;
const KIND_SYMLINK: u8 = 2;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("truncated packed image: {0}")]
    Truncated(#[from] io::Error),
    #[error("packed image declared length {declared} but {actual} bytes were supplied")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("unknown packed-image record kind {0}")]
    UnknownKind(u8),
    #[error("malformed name or path in packed image: {0}")]
    Name(VfsError),
}

impl From<ImageError> for VfsError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Name(inner) => inner,
            other => VfsError::new(VfsErrorKind::Invalid, leak_context(other)),
        }
    }
}

/// `VfsError::context` wants a `&'static str`; image-decode errors are only
/// produced at startup (and are fatal there), so leaking the rendered
/// message once is an acceptable trade for keeping `VfsError`
/// allocation-free everywhere else.
fn leak_context(e: ImageError) -> &'static str {
    match e {
        ImageError::Truncated(_) => "image.truncated",
        ImageError::LengthMismatch { .. } => "image.length_mismatch",
        ImageError::UnknownKind(_) => "image.unknown_kind",
        ImageError::Name(_) => "image.bad_name",
    }
}

/// Owns the inode graph and mount table for one guest instance.
#[derive(Default)]
pub struct MemFs {
    pub graph: InodeGraph,
    pub mounts: MountTable,
}

impl MemFs {
    pub fn new() -> Self {
        Self {
            graph: InodeGraph::new(),
            mounts: MountTable::new(),
        }
    }

    /// Materializes a packed image into fresh preopened mounts. Called once
    /// at startup, before host-ABI preopen registration; also the
    /// implementation of the `wasi_vfs_pack_fs` reactor-model re-pack entry
    /// point.
    pub fn load_image(&mut self, bytes: &[u8]) -> VfsResult<()> {
        load_image(&mut self.graph, &mut self.mounts, bytes).map_err(VfsError::from)
    }

    /// Serializes the current graph and mount table back into the packed
    /// format, the inverse of [`MemFs::load_image`].
    pub fn encode_image(&self) -> VfsResult<Vec<u8>> {
        encode_image(&self.graph, &self.mounts)
    }

    /// The reactor-model `wasi_vfs_pack_fs` export: tears down the current
    /// graph and mount set entirely before installing the new image, so a
    /// repack from a running instance never leaves stale mounts addressable
    /// alongside the new ones.
    pub fn repack(&mut self, bytes: &[u8]) -> VfsResult<()> {
        self.graph = InodeGraph::new();
        self.mounts = MountTable::new();
        self.load_image(bytes)
    }
}

/// Parses a packed image and registers one preopened mount per top-level
/// entry. `graph` and `mounts` are mutated in place; on any error the caller
/// should treat this as the fatal "corrupted image during startup" case
/// rather than try to partially recover.
pub fn load_image(
    graph: &mut InodeGraph,
    mounts: &mut MountTable,
    bytes: &[u8],
) -> Result<(), ImageError> {
    let mut framing = Cursor::new(bytes);
    let declared_len = framing.read_u32::<LittleEndian>()? as usize;
    let body_start = framing.position() as usize;
    let body_end = body_start + declared_len;
    if body_end > bytes.len() {
        return Err(ImageError::LengthMismatch {
            declared: declared_len,
            actual: bytes.len().saturating_sub(body_start),
        });
    }
    let mut cursor = Cursor::new(&bytes[body_start..body_end]);
    while (cursor.position() as usize) < cursor.get_ref().len() {
        let prefix_len = cursor.read_u32::<LittleEndian>()? as usize;
        let mut prefix = vec![0u8; prefix_len];
        cursor.read_exact(&mut prefix)?;
        let root = graph.new_preopen_dir();
        let decoded = decode_record(&mut cursor)?;
        materialize(graph, root, decoded).map_err(ImageError::Name)?;
        trace!(prefix = %String::from_utf8_lossy(&prefix), "registering mount from packed image");
        mounts
            .add_mount(prefix, root, false)
            .map_err(ImageError::Name)?;
    }
    Ok(())
}

pub fn encode_image(graph: &InodeGraph, mounts: &MountTable) -> VfsResult<Vec<u8>> {
    let mut body = Vec::new();
    for mount in mounts.mounts() {
        body.write_u32::<LittleEndian>(mount.prefix.len() as u32)
            .map_err(io_err)?;
        body.write_all(&mount.prefix).map_err(io_err)?;
        let root_node = graph.link(mount.root)?.node;
        encode_node(graph, root_node, b"", &mut body)?;
    }
    let mut image = Vec::with_capacity(body.len() + 4);
    image
        .write_u32::<LittleEndian>(body.len() as u32)
        .map_err(io_err)?;
    image.extend_from_slice(&body);
    Ok(image)
}

fn io_err(_e: io::Error) -> VfsError {
    VfsError::new(VfsErrorKind::Io, "image.io")
}

enum Decoded {
    Dir { name: Vec<u8>, children: Vec<Decoded> },
    File { name: Vec<u8>, bytes: Vec<u8> },
    Symlink { name: Vec<u8>, target: Vec<u8> },
}

fn decode_record(cursor: &mut Cursor<&[u8]>) -> Result<Decoded, ImageError> {
    let kind = cursor.read_u8()?;
    let name_len = cursor.read_u32::<LittleEndian>()? as usize;
    let mut name = vec![0u8; name_len];
    cursor.read_exact(&mut name)?;
    match kind {
        KIND_DIR => {
            let entry_count = cursor.read_u32::<LittleEndian>()?;
            let mut children = Vec::with_capacity(entry_count as usize);
            for _ in 0..entry_count {
                children.push(decode_record(cursor)?);
            }
            Ok(Decoded::Dir { name, children })
        }
        KIND_FILE => {
            let size = cursor.read_u64::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; size];
            cursor.read_exact(&mut bytes)?;
            Ok(Decoded::File { name, bytes })
        }
        KIND_SYMLINK => {
            let target_len = cursor.read_u32::<LittleEndian>()? as usize;
            let mut target = vec![0u8; target_len];
            cursor.read_exact(&mut target)?;
            Ok(Decoded::Symlink { name, target })
        }
        other => Err(ImageError::UnknownKind(other)),
    }
}

/// Inserts a decoded subtree's *children* under `parent_link`. The decoded
/// node's own name is discarded for the top-level call (the mount's root has
/// no name of its own) and used for every recursive child.
fn materialize(graph: &mut InodeGraph, parent_link: LinkId, decoded: Decoded) -> VfsResult<()> {
    let children = match decoded {
        Decoded::Dir { children, .. } => children,
        // A mount whose image root is a bare file or symlink is malformed;
        // the format only promises DIR records at mount roots.
        _ => return Err(VfsError::new(VfsErrorKind::Invalid, "image.root_not_dir")),
    };
    for child in children {
        insert_decoded(graph, parent_link, child)?;
    }
    Ok(())
}

fn insert_decoded(graph: &mut InodeGraph, parent_link: LinkId, decoded: Decoded) -> VfsResult<()> {
    match decoded {
        Decoded::Dir { name, children } => {
            let link = graph.new_dir(parent_link, VfsName::new(&name)?)?;
            for child in children {
                insert_decoded(graph, link, child)?;
            }
        }
        Decoded::File { name, bytes } => {
            graph.new_file(parent_link, VfsName::new(&name)?, bytes)?;
        }
        Decoded::Symlink { name, target } => {
            graph.new_symlink(parent_link, VfsName::new(&name)?, target)?;
        }
    }
    Ok(())
}

fn encode_node(
    graph: &InodeGraph,
    node_id: NodeId,
    name: &[u8],
    out: &mut Vec<u8>,
) -> VfsResult<()> {
    let node = graph.node(node_id)?;
    match &node.kind {
        NodeKind::Directory { entries } => {
            out.push(KIND_DIR);
            out.write_u32::<LittleEndian>(name.len() as u32).map_err(io_err)?;
            out.extend_from_slice(name);
            out.write_u32::<LittleEndian>(entries.len() as u32).map_err(io_err)?;
            for (child_name, child_link) in entries {
                let child_node = graph.link(*child_link)?.node;
                encode_node(graph, child_node, child_name.as_bytes(), out)?;
            }
        }
        NodeKind::File { bytes, symlink: false } => {
            out.push(KIND_FILE);
            out.write_u32::<LittleEndian>(name.len() as u32).map_err(io_err)?;
            out.extend_from_slice(name);
            out.write_u64::<LittleEndian>(bytes.len() as u64).map_err(io_err)?;
            out.extend_from_slice(bytes);
        }
        NodeKind::File { bytes, symlink: true } => {
            out.push(KIND_SYMLINK);
            out.write_u32::<LittleEndian>(name.len() as u32).map_err(io_err)?;
            out.extend_from_slice(name);
            out.write_u32::<LittleEndian>(bytes.len() as u32).map_err(io_err)?;
            out.extend_from_slice(bytes);
        }
    }
    Ok(())
}
