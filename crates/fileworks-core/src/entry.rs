//! Filesystem entry types.

use std::fs::{FileType, Metadata};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FsError;

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link. Never followed.
    Symlink,
    /// Other file types (sockets, FIFOs, devices).
    Other,
}

impl EntryKind {
    /// Classify a file type without following links.
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

impl From<&Metadata> for EntryKind {
    fn from(metadata: &Metadata) -> Self {
        Self::from_file_type(metadata.file_type())
    }
}

/// One filesystem node visited during a traversal.
///
/// Entries are created while walking, never mutated, and dropped once the
/// node has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Full path of the node.
    pub path: PathBuf,
    /// Node type, read without following links.
    pub kind: EntryKind,
}

impl Entry {
    /// Create a new entry.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Read the type of `path` from the filesystem without following links.
    pub fn stat(path: impl Into<PathBuf>) -> Result<Self, FsError> {
        let path = path.into();
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| FsError::io(&path, e))?;
        Ok(Self {
            kind: EntryKind::from(&metadata),
            path,
        })
    }

    /// The path of this entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}
