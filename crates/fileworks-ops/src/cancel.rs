//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Something an operation polls to decide whether to stop early.
///
/// Polled at the head of every traversal step and between copy chunks.
/// Nothing already done is undone when it trips.
pub trait Cancellable {
    /// Whether the caller asked to stop.
    fn is_cancelled(&self) -> bool;
}

/// A [`Cancellable`] that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl Cancellable for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Cancellable for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<T: Cancellable + ?Sized> Cancellable for &T {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Adapts a closure into a [`Cancellable`].
#[derive(Debug, Clone, Copy)]
pub struct CancelFn<F>(pub F);

impl<F: Fn() -> bool> Cancellable for CancelFn<F> {
    fn is_cancelled(&self) -> bool {
        (self.0)()
    }
}
