//! Progress reporting for running operations.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::operation::OperationType;

/// Shared counters of one operation.
///
/// Only the thread running the operation writes; any number of threads may
/// read. Each field is read independently, so a [`snapshot`](Progress::snapshot)
/// taken while the operation runs may mix values from different moments.
#[derive(Debug, Clone)]
pub struct Progress {
    inner: Arc<ProgressInner>,
}

#[derive(Debug)]
struct ProgressInner {
    operation_type: OperationType,
    items: AtomicU64,
    bytes: AtomicU64,
    failures: AtomicU64,
    done: AtomicBool,
    current_path: Arc<Mutex<Option<PathBuf>>>,
}

impl Progress {
    /// Create progress for an operation that has not started.
    pub fn new(operation_type: OperationType) -> Self {
        Self::with_path_slot(operation_type, Arc::new(Mutex::new(None)))
    }

    fn with_path_slot(
        operation_type: OperationType,
        current_path: Arc<Mutex<Option<PathBuf>>>,
    ) -> Self {
        Self {
            inner: Arc::new(ProgressInner {
                operation_type,
                items: AtomicU64::new(0),
                bytes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                done: AtomicBool::new(false),
                current_path,
            }),
        }
    }

    /// Separate counters whose current path is written through to `self`.
    ///
    /// Used when one operation runs another internally: the inner counts stay
    /// private while readers of `self` still see which path is being worked on.
    pub(crate) fn nested(&self, operation_type: OperationType) -> Self {
        Self::with_path_slot(operation_type, Arc::clone(&self.inner.current_path))
    }

    /// The operation these counters belong to.
    pub fn operation_type(&self) -> OperationType {
        self.inner.operation_type
    }

    /// Items processed so far.
    pub fn item_count(&self) -> u64 {
        self.inner.items.load(Ordering::Relaxed)
    }

    /// Bytes processed so far.
    pub fn byte_count(&self) -> u64 {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    /// Failures recorded so far.
    pub fn failure_count(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Whether the operation has finished, successfully or not.
    pub fn is_done(&self) -> bool {
        self.inner.done.load(Ordering::Acquire)
    }

    /// The path being processed right now, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.inner.current_path.lock().clone()
    }

    /// Read all counters at once.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            operation_type: self.operation_type(),
            items: self.item_count(),
            bytes: self.byte_count(),
            failures: self.failure_count(),
            current_path: self.current_path(),
            done: self.is_done(),
        }
    }

    pub(crate) fn add_item(&self) {
        self.inner.items.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.inner.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn add_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_current_path(&self, path: Option<PathBuf>) {
        *self.inner.current_path.lock() = path;
    }

    /// Return a guard that marks the operation done when dropped.
    pub(crate) fn start(&self) -> DoneGuard<'_> {
        DoneGuard { progress: self }
    }
}

/// Sets the done flag and clears the current path on every exit path.
#[must_use]
pub(crate) struct DoneGuard<'a> {
    progress: &'a Progress,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.progress.set_current_path(None);
        self.progress.inner.done.store(true, Ordering::Release);
    }
}

/// Point-in-time view of an operation's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Items processed so far.
    pub items: u64,
    /// Bytes processed so far.
    pub bytes: u64,
    /// Failures recorded so far.
    pub failures: u64,
    /// The path being processed.
    pub current_path: Option<PathBuf>,
    /// Whether the operation has finished.
    pub done: bool,
}

impl ProgressSnapshot {
    /// Check if the operation has any failures.
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}
