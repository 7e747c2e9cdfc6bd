//! Delete files and directory trees.

use std::fs;
use std::path::{Path, PathBuf};

use fileworks_core::{Entry, Failure, FsError, OperationError};
use indexmap::IndexSet;

use crate::cancel::Cancellable;
use crate::operation::{FailureRecorder, Operation, OperationType, Summary, root_set};
use crate::progress::Progress;
use crate::traverse::{Order, Visitor, traverse};

/// Removes a set of roots and everything below them.
///
/// Walks in post-order so every directory is empty by the time it is removed.
/// When a child cannot be removed its parent then fails too, because it is
/// not empty; both are recorded and the walk carries on with the siblings.
#[derive(Debug)]
pub struct Delete {
    roots: IndexSet<PathBuf>,
    progress: Progress,
}

impl Delete {
    /// Create a delete over `roots`.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: root_set(roots),
            progress: Progress::new(OperationType::Delete),
        }
    }

    /// Items deleted so far.
    pub fn deleted_item_count(&self) -> u64 {
        self.progress.item_count()
    }

    /// Bytes deleted so far.
    pub fn deleted_byte_count(&self) -> u64 {
        self.progress.byte_count()
    }
}

struct DeleteVisitor<'a> {
    progress: &'a Progress,
    failures: &'a mut FailureRecorder,
}

impl DeleteVisitor<'_> {
    fn removed(&self, size: u64) {
        self.progress.add_item();
        self.progress.add_bytes(size);
    }
}

impl Visitor for DeleteVisitor<'_> {
    fn on_file(&mut self, entry: &Entry) -> Result<(), FsError> {
        let size = fs::symlink_metadata(&entry.path)
            .map_err(|e| FsError::io(&entry.path, e))?
            .len();
        fs::remove_file(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
        self.removed(size);
        Ok(())
    }

    fn on_directory(&mut self, entry: &Entry) -> Result<(), FsError> {
        fs::remove_dir(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
        self.removed(0);
        Ok(())
    }

    fn on_symlink(&mut self, entry: &Entry) -> Result<(), FsError> {
        remove_link(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
        self.removed(0);
        Ok(())
    }

    fn on_failure(&mut self, failure: Failure) {
        self.failures.record(failure);
    }
}

#[cfg(windows)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    // Directory symlinks on Windows are removed like directories.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path)
}

/// Delete `roots` in post-order, recording into an existing run.
///
/// Returns true if the walk was cancelled.
pub(crate) fn delete_tree<'a>(
    roots: impl IntoIterator<Item = &'a Path>,
    cancel: &dyn Cancellable,
    progress: &Progress,
    failures: &mut FailureRecorder,
) -> bool {
    let mut visitor = DeleteVisitor { progress, failures };
    traverse(roots, Order::PostOrder, cancel, progress, &mut visitor).is_cancelled()
}

impl Operation for Delete {
    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }

    fn execute(self, cancel: &dyn Cancellable) -> Result<Summary, OperationError> {
        let _done = self.progress.start();
        tracing::debug!(roots = self.roots.len(), "delete started");

        let mut failures = FailureRecorder::new(self.progress.clone());
        let cancelled = delete_tree(
            self.roots.iter().map(PathBuf::as_path),
            cancel,
            &self.progress,
            &mut failures,
        );

        failures.finish(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;

    #[test]
    fn test_delete_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/1.txt"), b"12345").unwrap();
        fs::write(root.join("2.txt"), b"12").unwrap();

        let summary = Delete::new([&root]).execute(&NeverCancel).unwrap();

        assert!(!root.exists());
        assert_eq!(summary.items, 5);
        assert_eq!(summary.bytes, 7);
    }

    #[test]
    fn test_delete_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"xyz").unwrap();

        let summary = Delete::new([&file]).execute(&NeverCancel).unwrap();
        assert!(!file.exists());
        assert_eq!(summary.items, 1);
        assert_eq!(summary.bytes, 3);
    }

    #[test]
    fn test_cancelled_delete_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"xyz").unwrap();

        let delete = Delete::new([&file]);
        let progress = delete.progress();
        let summary = delete.execute(&AtomicBool::new(true)).unwrap();

        assert!(summary.cancelled);
        assert!(file.exists());
        assert_eq!(summary.items, 0);
        assert!(progress.is_done());
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_removes_link_not_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), b"keep").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let summary = Delete::new([&link]).execute(&NeverCancel).unwrap();

        assert_eq!(summary.items, 1);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.join("keep.txt").exists());
    }

    #[test]
    fn test_missing_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = Delete::new([temp.path().join("missing")])
            .execute(&NeverCancel)
            .unwrap_err();
        let failures = err.failures().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures.primary().cause, FsError::NotFound { .. }));
    }
}
