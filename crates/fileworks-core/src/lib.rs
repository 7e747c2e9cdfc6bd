//! Core types for fileworks.
//!
//! This crate provides the data model shared by the operation engine and its
//! front ends: filesystem entries, per-node errors, failure aggregation and
//! engine configuration.

mod config;
mod entry;
mod error;
mod failure;

pub use config::{DEFAULT_BUFFER_SIZE, OpsConfig, OpsConfigBuilder};
pub use entry::{Entry, EntryKind};
pub use error::{FsError, OperationError};
pub use failure::{Failure, FailureAggregate};
