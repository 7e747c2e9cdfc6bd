//! Per-node failures and their aggregation.

use std::path::{Path, PathBuf};

use crate::FsError;

/// A node that could not be processed, and why.
#[derive(Debug)]
pub struct Failure {
    /// The path that failed.
    pub path: PathBuf,
    /// The underlying cause.
    pub cause: FsError,
}

impl Failure {
    /// Create a new failure.
    pub fn new(path: impl Into<PathBuf>, cause: FsError) -> Self {
        Self {
            path: path.into(),
            cause,
        }
    }

    /// The path that failed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-line message for display.
    pub fn message(&self) -> String {
        format!("{}: {}", self.path.display(), self.cause)
    }
}

impl From<FsError> for Failure {
    fn from(cause: FsError) -> Self {
        Self {
            path: cause.path().to_path_buf(),
            cause,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.cause)
    }
}

/// All failures recorded by one operation run, in the order they occurred.
///
/// Never empty. The first failure is the primary cause and is what
/// [`std::error::Error::source`] returns; the rest are reachable with
/// [`iter`](Self::iter).
#[derive(Debug)]
pub struct FailureAggregate {
    failures: Vec<Failure>,
}

impl FailureAggregate {
    /// Wrap a list of failures, or `None` if the list is empty.
    pub fn from_failures(failures: Vec<Failure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// The first failure recorded.
    pub fn primary(&self) -> &Failure {
        // Non-empty by construction.
        &self.failures[0]
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Iterate over all failures in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.failures.iter()
    }

    /// The failed paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.failures.iter().map(|f| f.path())
    }

    /// One message per failed path.
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(Failure::message).collect()
    }

    /// Consume the aggregate and return the failures.
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }
}

impl std::fmt::Display for FailureAggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.failures.len() {
            1 => write!(f, "1 failure: {}", self.primary()),
            n => write!(f, "{} failures, first: {}", n, self.primary()),
        }
    }
}

impl std::error::Error for FailureAggregate {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary().cause)
    }
}

impl<'a> IntoIterator for &'a FailureAggregate {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}
