//! Count items and total file size of a set of roots.

use std::path::PathBuf;

use fileworks_core::{Entry, Failure, FsError, OperationError};
use indexmap::IndexSet;

use crate::cancel::Cancellable;
use crate::operation::{FailureRecorder, Operation, OperationType, Summary, root_set};
use crate::progress::Progress;
use crate::traverse::{Order, Visitor, traverse};

/// Counts every file and directory under a set of roots and sums file sizes.
///
/// Read-only. Symbolic links are skipped entirely; directories add to the
/// item count but not to the byte count.
#[derive(Debug)]
pub struct Count {
    roots: IndexSet<PathBuf>,
    progress: Progress,
}

impl Count {
    /// Create a count over `roots`. Duplicate roots are counted once.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: root_set(roots),
            progress: Progress::new(OperationType::Count),
        }
    }

    /// Items counted so far.
    pub fn item_count(&self) -> u64 {
        self.progress.item_count()
    }

    /// Bytes counted so far.
    pub fn byte_count(&self) -> u64 {
        self.progress.byte_count()
    }
}

struct CountVisitor<'a> {
    progress: &'a Progress,
    failures: FailureRecorder,
}

impl Visitor for CountVisitor<'_> {
    fn on_file(&mut self, entry: &Entry) -> Result<(), FsError> {
        let metadata =
            std::fs::symlink_metadata(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
        self.progress.add_item();
        self.progress.add_bytes(metadata.len());
        Ok(())
    }

    fn on_directory(&mut self, _entry: &Entry) -> Result<(), FsError> {
        self.progress.add_item();
        Ok(())
    }

    fn on_failure(&mut self, failure: Failure) {
        self.failures.record(failure);
    }
}

impl Operation for Count {
    fn operation_type(&self) -> OperationType {
        OperationType::Count
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }

    fn execute(self, cancel: &dyn Cancellable) -> Result<Summary, OperationError> {
        let _done = self.progress.start();
        tracing::debug!(roots = self.roots.len(), "count started");

        let mut visitor = CountVisitor {
            progress: &self.progress,
            failures: FailureRecorder::new(self.progress.clone()),
        };
        let traversal = traverse(
            self.roots.iter().map(PathBuf::as_path),
            Order::BreadthFirst,
            cancel,
            &self.progress,
            &mut visitor,
        );

        visitor.failures.finish(traversal.is_cancelled())
    }
}
