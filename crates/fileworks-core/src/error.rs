//! Error types for file operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::FailureAggregate;

/// Why a single node could not be processed.
///
/// These never abort an operation on their own; the running operation records
/// them as [`Failure`](crate::Failure)s and moves on to the next node.
#[derive(Debug, Error)]
pub enum FsError {
    /// A directory could not be listed.
    #[error("Cannot read directory: {path}")]
    NoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Something already exists where a new node was to be created.
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A directory was expected.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Not a regular file, directory or symbolic link.
    #[error("Not a file or directory: {path}")]
    UnsupportedType { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            std::io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a listing error for a directory.
    pub fn no_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::NoRead {
            path: path.into(),
            source,
        }
    }

    /// The path this error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NoRead { path, .. }
            | Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::AlreadyExists { path }
            | Self::NotADirectory { path }
            | Self::UnsupportedType { path }
            | Self::Io { path, .. } => path,
        }
    }
}

/// Errors returned by a whole operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The destination is a source root or lies inside one.
    ///
    /// Raised before any traversal starts; nothing has been touched.
    #[error("Cannot paste {root} into itself ({destination})")]
    CannotPasteIntoSelf { root: PathBuf, destination: PathBuf },

    /// The destination directory could not be resolved.
    #[error("Invalid destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One or more nodes failed while the operation ran to completion.
    #[error(transparent)]
    Failed(#[from] FailureAggregate),

    /// The worker running the operation stopped without reporting a result.
    #[error("Operation aborted: {0}")]
    Aborted(String),
}

impl OperationError {
    /// Check if this error was raised before any work was performed.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::CannotPasteIntoSelf { .. } | Self::Destination { .. }
        )
    }

    /// The per-node failures, if this is an aggregate error.
    pub fn failures(&self) -> Option<&FailureAggregate> {
        match self {
            Self::Failed(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}
