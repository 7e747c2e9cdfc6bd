//! Bulk file operations engine for fileworks.
//!
//! Four operations share one traversal core:
//!
//! - [`Count`] sums items and file sizes, read-only.
//! - [`Delete`] removes trees children-first.
//! - [`Copy`] duplicates trees into a destination directory.
//! - [`Move`] renames into a destination directory, copying and deleting
//!   across filesystems.
//!
//! Every operation polls a [`Cancellable`] between steps, keeps going past
//! per-node failures and reports them together as a
//! [`FailureAggregate`](fileworks_core::FailureAggregate) at the end. Copy and
//! Move refuse to paste a directory into itself and never overwrite: a taken
//! name gets a numbered variant such as `a 2.txt`.
//!
//! Operations are blocking. Use [`OperationExecutor`] to run one on the tokio
//! blocking pool with periodic progress events.

mod cancel;
mod conflict;
mod copy;
mod count;
mod delete;
mod executor;
mod guard;
mod move_op;
mod operation;
mod progress;
mod traverse;

pub use cancel::{CancelFn, Cancellable, NeverCancel};
pub use conflict::resolve_conflict;
pub use copy::Copy;
pub use count::Count;
pub use delete::Delete;
pub use executor::{OperationEvent, OperationExecutor, OperationHandle};
pub use guard::{check_not_into_self, resolve_destination};
pub use move_op::Move;
pub use operation::{Operation, OperationType, Summary};
pub use progress::{Progress, ProgressSnapshot};
pub use traverse::{Order, Traversal, Visitor, list_children, traverse};

pub use fileworks_core::{
    Entry, EntryKind, Failure, FailureAggregate, FsError, OperationError, OpsConfig,
};
pub use tokio_util::sync::CancellationToken;
