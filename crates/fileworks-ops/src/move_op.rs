//! Move files and directory trees into a destination directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fileworks_core::{Failure, FsError, OperationError, OpsConfig};
use indexmap::IndexSet;

use crate::cancel::Cancellable;
use crate::copy::{TreeCopier, paste_target};
use crate::delete::delete_tree;
use crate::guard::{check_all, resolve_destination};
use crate::operation::{FailureRecorder, Operation, OperationType, Summary, root_set};
use crate::progress::Progress;

/// Moves a set of roots into a destination directory.
///
/// Each root is renamed in one step when possible. When the destination is on
/// another filesystem the root is copied and, only if that copy finished
/// cleanly, the original is deleted. Conflicting names are resolved the same
/// way as for [`Copy`](crate::Copy).
#[derive(Debug)]
pub struct Move {
    roots: IndexSet<PathBuf>,
    destination: PathBuf,
    config: OpsConfig,
    progress: Progress,
}

/// Outcome of moving one root.
#[derive(Debug, PartialEq, Eq)]
enum Moved {
    /// The root now lives in the destination.
    Done,
    /// The copy fallback failed part-way; the original was kept.
    Kept,
    /// Cancelled during the copy fallback.
    Cancelled,
}

impl Move {
    /// Create a move of `roots` into `destination` with default settings.
    pub fn new<I, P>(roots: I, destination: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_config(roots, destination, OpsConfig::default())
    }

    /// Create a move with explicit settings. The buffer size only matters when
    /// moving across filesystems.
    pub fn with_config<I, P>(roots: I, destination: impl Into<PathBuf>, config: OpsConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: root_set(roots),
            destination: destination.into(),
            config,
            progress: Progress::new(OperationType::Move),
        }
    }

    /// Roots moved so far.
    ///
    /// Every root counts once however many nodes lie beneath it, whether it was
    /// renamed in one step or copied across filesystems and then deleted. A
    /// root whose cross-filesystem copy failed part-way is not counted.
    pub fn moved_item_count(&self) -> u64 {
        self.progress.item_count()
    }

    fn move_root(
        &self,
        root: &Path,
        destination: &Path,
        cancel: &dyn Cancellable,
        failures: &mut FailureRecorder,
    ) -> Result<Moved, FsError> {
        let target = paste_target(root, destination)?;
        match fs::rename(root, &target) {
            Ok(()) => {
                tracing::trace!(from = %root.display(), to = %target.display(), "renamed");
                Ok(Moved::Done)
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(path = %root.display(), "crosses devices, copying instead");
                Ok(copy_then_delete(
                    root,
                    &target,
                    &self.config,
                    cancel,
                    &self.progress,
                    failures,
                ))
            }
            Err(e) => Err(FsError::io(root, e)),
        }
    }
}

impl Operation for Move {
    fn operation_type(&self) -> OperationType {
        OperationType::Move
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }

    fn execute(self, cancel: &dyn Cancellable) -> Result<Summary, OperationError> {
        let _done = self.progress.start();

        let destination = resolve_destination(&self.destination)?;
        check_all(&self.roots, &destination)?;
        tracing::debug!(
            roots = self.roots.len(),
            destination = %destination.display(),
            "move started"
        );

        let mut failures = FailureRecorder::new(self.progress.clone());
        let mut cancelled = false;

        for root in &self.roots {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            self.progress.set_current_path(Some(root.clone()));

            match self.move_root(root, &destination, cancel, &mut failures) {
                Ok(Moved::Done) => self.progress.add_item(),
                Ok(Moved::Kept) => {}
                Ok(Moved::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => failures.record(Failure::new(root, e)),
            }
        }

        failures.finish(cancelled)
    }
}

/// Copy `root` to `target`, then delete `root` if the copy was clean.
///
/// Failures of either half go into `failures`. Counting happens on nested
/// progress so bytes written here do not show up as moved bytes, but the path
/// being worked on is still reported through `progress`.
fn copy_then_delete(
    root: &Path,
    target: &Path,
    config: &OpsConfig,
    cancel: &dyn Cancellable,
    progress: &Progress,
    failures: &mut FailureRecorder,
) -> Moved {
    let copied = progress.nested(OperationType::Copy);
    let before = failures.len();

    let traversal = TreeCopier::new(config, cancel, &copied).copy(root, target, failures);
    if traversal.is_cancelled() {
        return Moved::Cancelled;
    }
    if failures.len() > before {
        tracing::warn!(
            path = %root.display(),
            "copy incomplete, keeping original"
        );
        return Moved::Kept;
    }

    let removed = progress.nested(OperationType::Delete);
    if delete_tree([root], cancel, &removed, failures) {
        return Moved::Cancelled;
    }
    if failures.len() > before {
        return Moved::Kept;
    }
    Moved::Done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelFn, NeverCancel};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[test]
    fn test_move_renames_into_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dir");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("sub/f.txt"), b"abc").unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let summary = Move::new([&source], &dest).execute(&NeverCancel).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(dest.join("dir/sub/f.txt")).unwrap(), b"abc");
        assert_eq!(summary.items, 1);
        assert_eq!(summary.bytes, 0);
    }

    #[test]
    fn test_move_resolves_conflicts() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, b"new").unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("a.txt"), b"old").unwrap();

        Move::new([&source], &dest).execute(&NeverCancel).unwrap();

        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"old");
        assert_eq!(fs::read(dest.join("a 2.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_move_into_current_parent_renames() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, b"x").unwrap();

        let summary = Move::new([&source], temp.path()).execute(&NeverCancel).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(temp.path().join("a 2.txt")).unwrap(), b"x");
        assert_eq!(summary.items, 1);
    }

    #[test]
    fn test_move_into_self_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a");
        fs::create_dir_all(source.join("b")).unwrap();

        let err = Move::new([&source], source.join("b"))
            .execute(&NeverCancel)
            .unwrap_err();

        assert!(matches!(err, OperationError::CannotPasteIntoSelf { .. }));
        assert!(source.join("b").is_dir());
        assert_eq!(fs::read_dir(source.join("b")).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_then_delete_fallback() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tree");
        fs::create_dir_all(source.join("x")).unwrap();
        fs::write(source.join("x/1"), b"1").unwrap();
        fs::write(source.join("2"), b"22").unwrap();
        let target = temp.path().join("moved");

        let config = OpsConfig::default();
        let progress = Progress::new(OperationType::Move);
        let mut failures = FailureRecorder::new(progress.clone());
        let seen = RefCell::new(Vec::new());
        let cancel = CancelFn(|| {
            seen.borrow_mut().extend(progress.current_path());
            false
        });
        let moved = copy_then_delete(&source, &target, &config, &cancel, &progress, &mut failures);

        // The nested copy and delete keep their counts to themselves but
        // report where they are.
        assert_eq!(moved, Moved::Done);
        assert!(failures.is_empty());
        assert_eq!(progress.item_count(), 0);
        assert_eq!(progress.byte_count(), 0);
        assert!(seen.borrow().contains(&source.join("x/1")));
        assert!(!source.exists());
        assert_eq!(fs::read(target.join("x/1")).unwrap(), b"1");
        assert_eq!(fs::read(target.join("2")).unwrap(), b"22");
    }

    #[test]
    fn test_fallback_keeps_original_when_copy_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tree");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("f"), b"data").unwrap();
        // A file where the copied directory should go makes the copy fail.
        let target = temp.path().join("blocked");
        fs::write(&target, b"").unwrap();

        let config = OpsConfig::default();
        let progress = Progress::new(OperationType::Move);
        let mut failures = FailureRecorder::new(progress.clone());
        let moved = copy_then_delete(&source, &target, &config, &NeverCancel, &progress, &mut failures);

        assert_eq!(moved, Moved::Kept);
        assert!(!failures.is_empty());
        assert!(source.join("f").exists());
    }
}
