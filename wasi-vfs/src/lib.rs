//! The WASI preview-1 interposition layer: a packed in-memory filesystem
//! image linked directly into a `wasm32-wasip1` guest, exposing the same
//! `wasi_snapshot_preview1` import namespace the guest already expects so
//! VFS-backed paths are served locally and everything else is forwarded to
//! the real host ABI.

pub mod abi;
pub mod config;
pub mod errno;
pub mod fdtable;
pub mod host_abi;
pub mod interpose;
pub mod openfile;
pub mod startup;
pub mod state;

pub use config::VfsConfig;
pub use errno::Errno;
pub use state::{global, VfsState};
