//! Tree traversal shared by all operations.
//!
//! Two orders are supported:
//!
//! - **Breadth-first**: siblings before descending further. Used by Count and
//!   as the read side of Copy.
//! - **Post-order**: all children of a directory before the directory itself.
//!   Used by Delete so a directory is only removed once it is empty.
//!
//! Symbolic links are never followed. Cancellation is checked before every
//! node; when it trips, traversal stops where it is and nothing is rolled back.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use fileworks_core::{Entry, EntryKind, Failure, FsError};

use crate::cancel::Cancellable;
use crate::progress::Progress;

/// Order in which nodes are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Level by level, parents before children.
    BreadthFirst,
    /// Children before parents.
    PostOrder,
}

/// How a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Every reachable node was visited.
    Completed,
    /// Stopped early because the caller cancelled.
    Cancelled,
}

impl Traversal {
    /// Check if the traversal was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Per-node hooks driven by [`traverse`].
///
/// Errors returned from hooks are handed back through [`on_failure`](Visitor::on_failure);
/// the traversal itself never aborts because of them.
pub trait Visitor {
    /// A regular file, or a node that is neither file, directory nor link.
    fn on_file(&mut self, entry: &Entry) -> Result<(), FsError>;

    /// A directory. In breadth-first order a directory whose hook fails is
    /// not descended into.
    fn on_directory(&mut self, entry: &Entry) -> Result<(), FsError>;

    /// A symbolic link. Skipped unless overridden.
    fn on_symlink(&mut self, _entry: &Entry) -> Result<(), FsError> {
        Ok(())
    }

    /// A node could not be processed.
    fn on_failure(&mut self, failure: Failure);

    /// Fired once after the last node when the traversal was not cancelled.
    fn on_finish(&mut self) {}
}

/// Visit `roots` and everything below them in the given order.
pub fn traverse<'a, V, I>(
    roots: I,
    order: Order,
    cancel: &dyn Cancellable,
    progress: &Progress,
    visitor: &mut V,
) -> Traversal
where
    V: Visitor + ?Sized,
    I: IntoIterator<Item = &'a Path>,
{
    let mut entries = Vec::new();
    for root in roots {
        match Entry::stat(root) {
            Ok(entry) => entries.push(entry),
            Err(e) => visitor.on_failure(Failure::new(root, e)),
        }
    }

    let result = match order {
        Order::BreadthFirst => breadth_first(entries, cancel, progress, visitor),
        Order::PostOrder => post_order(entries, cancel, progress, visitor),
    };

    if result == Traversal::Completed {
        visitor.on_finish();
    }
    result
}

fn breadth_first<V: Visitor + ?Sized>(
    roots: Vec<Entry>,
    cancel: &dyn Cancellable,
    progress: &Progress,
    visitor: &mut V,
) -> Traversal {
    let mut queue: VecDeque<Entry> = roots.into();

    while let Some(entry) = queue.pop_front() {
        if cancel.is_cancelled() {
            return Traversal::Cancelled;
        }
        progress.set_current_path(Some(entry.path.clone()));

        let result = match entry.kind {
            EntryKind::Symlink => visitor.on_symlink(&entry),
            EntryKind::Directory => visitor
                .on_directory(&entry)
                .and_then(|()| list_children(&entry.path))
                .map(|children| queue.extend(children)),
            EntryKind::File | EntryKind::Other => visitor.on_file(&entry),
        };

        if let Err(e) = result {
            visitor.on_failure(Failure::new(entry.path, e));
        }
    }

    Traversal::Completed
}

struct Frame {
    entry: Entry,
    expanded: bool,
}

fn post_order<V: Visitor + ?Sized>(
    roots: Vec<Entry>,
    cancel: &dyn Cancellable,
    progress: &Progress,
    visitor: &mut V,
) -> Traversal {
    let mut stack: Vec<Frame> = roots
        .into_iter()
        .rev()
        .map(|entry| Frame {
            entry,
            expanded: false,
        })
        .collect();

    while let Some(frame) = stack.pop() {
        if cancel.is_cancelled() {
            return Traversal::Cancelled;
        }
        progress.set_current_path(Some(frame.entry.path.clone()));

        if frame.entry.is_dir() && !frame.expanded {
            let children = list_children(&frame.entry.path);
            let path = frame.entry.path.clone();
            stack.push(Frame {
                entry: frame.entry,
                expanded: true,
            });
            match children {
                Ok(children) => stack.extend(children.into_iter().rev().map(|entry| Frame {
                    entry,
                    expanded: false,
                })),
                // The directory itself is still visited; removing it fails on
                // its own if anything is left inside.
                Err(e) => visitor.on_failure(Failure::new(path, e)),
            }
            continue;
        }

        let entry = frame.entry;
        let result = match entry.kind {
            EntryKind::Symlink => visitor.on_symlink(&entry),
            EntryKind::Directory => visitor.on_directory(&entry),
            EntryKind::File | EntryKind::Other => visitor.on_file(&entry),
        };
        if let Err(e) = result {
            visitor.on_failure(Failure::new(entry.path, e));
        }
    }

    Traversal::Completed
}

/// List the direct children of a directory, sorted by name.
pub fn list_children(dir: &Path) -> Result<Vec<Entry>, FsError> {
    let read_dir = fs::read_dir(dir).map_err(|e| FsError::no_read(dir, e))?;

    let mut children = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|e| FsError::no_read(dir, e))?;
        let path: PathBuf = dir_entry.path();
        let kind = match dir_entry.file_type() {
            Ok(file_type) => EntryKind::from_file_type(file_type),
            Err(e) => return Err(FsError::no_read(dir, e)),
        };
        children.push(Entry::new(path, kind));
    }

    children.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(children)
}
