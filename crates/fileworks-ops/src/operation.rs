//! Operation types shared by Count, Delete, Copy and Move.

use std::path::PathBuf;

use fileworks_core::{Failure, FailureAggregate, OperationError};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::cancel::Cancellable;
use crate::progress::Progress;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Count,
    Delete,
    Copy,
    Move,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "Count"),
            Self::Delete => write!(f, "Delete"),
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
        }
    }
}

/// Final counters of an operation that finished without failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Items counted, deleted, copied or moved.
    pub items: u64,
    /// Bytes counted, deleted or copied. Always 0 for moves.
    pub bytes: u64,
    /// Whether the run stopped early because it was cancelled.
    pub cancelled: bool,
}

impl Summary {
    pub(crate) fn from_progress(progress: &Progress, cancelled: bool) -> Self {
        Self {
            operation_type: progress.operation_type(),
            items: progress.item_count(),
            bytes: progress.byte_count(),
            cancelled,
        }
    }

    /// Get a human-readable summary of the operation.
    pub fn describe(&self) -> String {
        let action = match self.operation_type {
            OperationType::Count => "Counted",
            OperationType::Delete => "Deleted",
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
        };

        let mut line = if self.operation_type == OperationType::Move {
            format!("{} {} items", action, self.items)
        } else {
            format!("{} {} items ({} bytes)", action, self.items, self.bytes)
        };
        if self.cancelled {
            line.push_str(", cancelled");
        }
        line
    }
}

/// A bulk file operation.
///
/// `execute` consumes the operation, so every instance runs at most once.
/// Observe it from other threads through the [`Progress`] handle taken
/// before execution.
pub trait Operation: Send + 'static {
    /// The type of this operation.
    fn operation_type(&self) -> OperationType;

    /// A handle to this operation's live counters.
    fn progress(&self) -> Progress;

    /// Run the operation to completion or until `cancel` trips.
    ///
    /// Cancellation is not an error: the summary reports how far it got.
    /// Per-node failures are collected and returned together at the end.
    fn execute(self, cancel: &dyn Cancellable) -> Result<Summary, OperationError>;
}

/// Deduplicate root paths, keeping the first occurrence of each.
pub(crate) fn root_set<I, P>(roots: I) -> IndexSet<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    roots.into_iter().map(Into::into).collect()
}

/// Collects per-node failures for one operation run.
#[derive(Debug)]
pub(crate) struct FailureRecorder {
    failures: Vec<Failure>,
    progress: Progress,
}

impl FailureRecorder {
    pub fn new(progress: Progress) -> Self {
        Self {
            failures: Vec::new(),
            progress,
        }
    }

    pub fn record(&mut self, failure: Failure) {
        tracing::debug!(path = %failure.path.display(), cause = %failure.cause, "operation failure");
        self.progress.add_failure();
        self.failures.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Turn the run into its final result.
    pub fn finish(self, cancelled: bool) -> Result<Summary, OperationError> {
        let summary = Summary::from_progress(&self.progress, cancelled);
        match FailureAggregate::from_failures(self.failures) {
            Some(aggregate) => {
                tracing::info!(
                    operation = %summary.operation_type,
                    failures = aggregate.len(),
                    "operation finished with failures"
                );
                Err(OperationError::Failed(aggregate))
            }
            None => {
                tracing::info!(operation = %summary.operation_type, "{}", summary.describe());
                Ok(summary)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_set_dedupes() {
        let roots = root_set(["/a", "/b", "/a"]);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots.get_index(0), Some(&PathBuf::from("/a")));
    }

    #[test]
    fn test_summary_describe() {
        let summary = Summary {
            operation_type: OperationType::Copy,
            items: 3,
            bytes: 42,
            cancelled: false,
        };
        assert_eq!(summary.describe(), "Copied 3 items (42 bytes)");

        let moved = Summary {
            operation_type: OperationType::Move,
            items: 2,
            bytes: 0,
            cancelled: true,
        };
        assert_eq!(moved.describe(), "Moved 2 items, cancelled");
    }

    #[test]
    fn test_recorder_without_failures_succeeds() {
        let progress = Progress::new(OperationType::Count);
        let recorder = FailureRecorder::new(progress);
        let summary = recorder.finish(false).unwrap();
        assert_eq!(summary.items, 0);
        assert!(!summary.cancelled);
    }
}
