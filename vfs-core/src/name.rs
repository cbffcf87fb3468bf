//! Directory entry names.
//!
//! Names are arbitrary non-empty octet strings not containing `/`
//! and not equal to `.` or `..`. Names are not required to be valid UTF-8
//! (non-ASCII but still UTF-8 names are expected to work fine; nothing
//! in the data model requires UTF-8 specifically).

use crate::error::{VfsError, VfsErrorKind, VfsResult};
use std::borrow::Borrow;
use std::fmt;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VfsName(Box<[u8]>);

impl VfsName {
    pub fn new(bytes: &[u8]) -> VfsResult<Self> {
        if bytes.is_empty() || bytes.contains(&b'/') || bytes == b"." || bytes == b".." {
            return Err(VfsError::new(VfsErrorKind::Invalid, "name.invalid"));
        }
        Ok(Self(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for VfsName {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for VfsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "VfsName({s:?})"),
            Err(_) => write!(f, "VfsName({:?})", self.0),
        }
    }
}
