//! Paste safety check.
//!
//! Copying or moving a directory into itself (or one of its descendants) would
//! recurse forever, so both paths are canonicalized and compared before any
//! work starts.

use std::io;
use std::path::{Path, PathBuf};

use fileworks_core::OperationError;

/// Resolve a destination directory to its canonical form.
pub fn resolve_destination(destination: &Path) -> Result<PathBuf, OperationError> {
    let canonical = destination
        .canonicalize()
        .map_err(|source| OperationError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

    if !canonical.is_dir() {
        return Err(OperationError::Destination {
            path: destination.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        });
    }
    Ok(canonical)
}

/// Canonical form of a source root.
///
/// A root that is itself a symlink is resolved up to its parent only, since
/// pasting copies the link and never descends through it.
fn canonical_root(root: &Path) -> io::Result<PathBuf> {
    let metadata = std::fs::symlink_metadata(root)?;
    if metadata.file_type().is_symlink() {
        let parent = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize()?,
            _ => std::env::current_dir()?,
        };
        match root.file_name() {
            Some(name) => Ok(parent.join(name)),
            None => root.canonicalize(),
        }
    } else {
        root.canonicalize()
    }
}

/// Reject pasting `root` into `destination` when `destination` is `root` or
/// lies below it.
///
/// `destination` must already be canonical (see [`resolve_destination`]).
/// Roots that cannot be resolved pass the check; they fail later as regular
/// per-node failures.
pub fn check_not_into_self(root: &Path, destination: &Path) -> Result<(), OperationError> {
    let Ok(canonical) = canonical_root(root) else {
        return Ok(());
    };

    // Path::starts_with compares whole components, so "/a" is not a prefix
    // of "/ab".
    if destination.starts_with(&canonical) {
        tracing::debug!(
            root = %canonical.display(),
            destination = %destination.display(),
            "refusing to paste into self"
        );
        return Err(OperationError::CannotPasteIntoSelf {
            root: root.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }
    Ok(())
}

/// Run [`check_not_into_self`] for every root before anything is touched.
pub fn check_all<'a>(
    roots: impl IntoIterator<Item = &'a PathBuf>,
    destination: &Path,
) -> Result<(), OperationError> {
    for root in roots {
        check_not_into_self(root, destination)?;
    }
    Ok(())
}
