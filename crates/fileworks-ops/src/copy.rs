//! Copy files and directory trees into a destination directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use fileworks_core::{Entry, EntryKind, Failure, FsError, OperationError, OpsConfig};
use indexmap::IndexSet;

use crate::cancel::Cancellable;
use crate::conflict::resolve_conflict;
use crate::guard::{check_all, resolve_destination};
use crate::operation::{FailureRecorder, Operation, OperationType, Summary, root_set};
use crate::progress::Progress;
use crate::traverse::{Order, Traversal, Visitor, traverse};

/// Copies a set of roots into a destination directory.
///
/// Existing entries in the destination are never overwritten; a root whose
/// name is taken is copied under a numbered name (see
/// [`resolve_conflict`]). Files are streamed through a bounded buffer,
/// symbolic links are copied as links, and modification times are carried
/// over when [`OpsConfig::preserve_timestamps`] is set.
#[derive(Debug)]
pub struct Copy {
    roots: IndexSet<PathBuf>,
    destination: PathBuf,
    config: OpsConfig,
    progress: Progress,
}

impl Copy {
    /// Create a copy of `roots` into `destination` with default settings.
    pub fn new<I, P>(roots: I, destination: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_config(roots, destination, OpsConfig::default())
    }

    /// Create a copy with explicit settings.
    pub fn with_config<I, P>(roots: I, destination: impl Into<PathBuf>, config: OpsConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: root_set(roots),
            destination: destination.into(),
            config,
            progress: Progress::new(OperationType::Copy),
        }
    }

    /// Items copied so far.
    pub fn copied_item_count(&self) -> u64 {
        self.progress.item_count()
    }

    /// Bytes copied so far.
    pub fn copied_byte_count(&self) -> u64 {
        self.progress.byte_count()
    }
}

impl Operation for Copy {
    fn operation_type(&self) -> OperationType {
        OperationType::Copy
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
            "copy started"
        );

        let mut failures = FailureRecorder::new(self.progress.clone());
        let mut copier = TreeCopier::new(&self.config, cancel, &self.progress);
        let mut cancelled = false;

        for root in &self.roots {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let target = match paste_target(root, &destination) {
                Ok(target) => target,
                Err(e) => {
                    failures.record(Failure::new(root, e));
                    continue;
                }
            };
            if copier.copy(root, &target, &mut failures).is_cancelled() {
                cancelled = true;
                break;
            }
        }

        failures.finish(cancelled)
    }
}

/// Where `root` lands inside `destination`, after conflict resolution.
pub(crate) fn paste_target(root: &Path, destination: &Path) -> Result<PathBuf, FsError> {
    let entry = Entry::stat(root)?;
    let name = root.file_name().ok_or_else(|| {
        FsError::io(
            root,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    resolve_conflict(destination, name, entry.is_dir()).map_err(|e| FsError::io(destination, e))
}

/// Copies whole trees, reusing one transfer buffer across files.
pub(crate) struct TreeCopier<'a> {
    config: &'a OpsConfig,
    cancel: &'a dyn Cancellable,
    progress: &'a Progress,
    buffer: Vec<u8>,
}

impl<'a> TreeCopier<'a> {
    pub fn new(config: &'a OpsConfig, cancel: &'a dyn Cancellable, progress: &'a Progress) -> Self {
        Self {
            config,
            cancel,
            progress,
            buffer: Vec::new(),
        }
    }

    /// Copy `root` to `target`, which must not exist yet.
    pub fn copy(&mut self, root: &Path, target: &Path, failures: &mut FailureRecorder) -> Traversal {
        let mut visitor = CopyVisitor {
            source_root: root,
            target_root: target,
            copier: self,
            failures,
            directory_times: Vec::new(),
            interrupted: false,
        };
        let progress = visitor.copier.progress;
        let cancel = visitor.copier.cancel;
        let traversal = traverse([root], Order::BreadthFirst, cancel, progress, &mut visitor);
        // A file transfer can see the cancel after the walk's last poll.
        if visitor.interrupted {
            Traversal::Cancelled
        } else {
            traversal
        }
    }
}

struct CopyVisitor<'a, 'b> {
    source_root: &'b Path,
    target_root: &'b Path,
    copier: &'b mut TreeCopier<'a>,
    failures: &'b mut FailureRecorder,
    directory_times: Vec<(PathBuf, FileTime)>,
    interrupted: bool,
}

enum Transfer {
    Complete,
    Cancelled,
}

impl CopyVisitor<'_, '_> {
    /// Map a source path below the root onto the destination tree.
    fn target_of(&self, source: &Path) -> PathBuf {
        match source.strip_prefix(self.source_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => self.target_root.join(relative),
            _ => self.target_root.to_path_buf(),
        }
    }

    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<Transfer, FsError> {
        let mut reader = File::open(source).map_err(|e| FsError::io(source, e))?;
        let metadata = reader.metadata().map_err(|e| FsError::io(source, e))?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .map_err(|e| FsError::io(target, e))?;

        let outcome = self.transfer(&mut reader, &mut writer, source, target);
        drop(writer);

        if !matches!(outcome, Ok(Transfer::Complete)) {
            if let Err(e) = fs::remove_file(target) {
                tracing::warn!(path = %target.display(), error = %e, "failed to delete partial file");
            }
            return outcome;
        }

        if self.copier.config.preserve_timestamps {
            let mtime = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_mtime(target, mtime) {
                tracing::warn!(path = %target.display(), error = %e, "failed to set modification time");
            }
        }
        Ok(Transfer::Complete)
    }

    fn transfer(
        &mut self,
        reader: &mut File,
        writer: &mut File,
        source: &Path,
        target: &Path,
    ) -> Result<Transfer, FsError> {
        if self.copier.buffer.is_empty() {
            self.copier.buffer.resize(self.copier.config.buffer_size.max(1), 0);
        }

        loop {
            if self.copier.cancel.is_cancelled() {
                return Ok(Transfer::Cancelled);
            }
            let n = match reader.read(&mut self.copier.buffer) {
                Ok(0) => return Ok(Transfer::Complete),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FsError::io(source, e)),
            };
            writer
                .write_all(&self.copier.buffer[..n])
                .map_err(|e| FsError::io(target, e))?;
            self.copier.progress.add_bytes(n as u64);
        }
    }
}

impl Visitor for CopyVisitor<'_, '_> {
    fn on_file(&mut self, entry: &Entry) -> Result<(), FsError> {
        if entry.kind == EntryKind::Other {
            return Err(FsError::UnsupportedType {
                path: entry.path.clone(),
            });
        }
        let target = self.target_of(&entry.path);
        match self.copy_file(&entry.path, &target)? {
            Transfer::Complete => self.copier.progress.add_item(),
            Transfer::Cancelled => self.interrupted = true,
        }
        Ok(())
    }

    fn on_directory(&mut self, entry: &Entry) -> Result<(), FsError> {
        let target = self.target_of(&entry.path);
        let metadata = fs::symlink_metadata(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;

        match fs::create_dir(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let is_dir = fs::symlink_metadata(&target)
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if !is_dir {
                    return Err(FsError::NotADirectory { path: target });
                }
            }
            Err(e) => return Err(FsError::io(&target, e)),
        }

        self.copier.progress.add_item();
        if self.copier.config.preserve_timestamps {
            self.directory_times
                .push((target, FileTime::from_last_modification_time(&metadata)));
        }
        Ok(())
    }

    fn on_symlink(&mut self, entry: &Entry) -> Result<(), FsError> {
        let target = self.target_of(&entry.path);
        let link = fs::read_link(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
        create_symlink(&link, &entry.path, &target).map_err(|e| FsError::io(&target, e))?;
        self.copier.progress.add_item();

        if self.copier.config.preserve_timestamps {
            if let Ok(metadata) = fs::symlink_metadata(&entry.path) {
                let atime = FileTime::from_last_access_time(&metadata);
                let mtime = FileTime::from_last_modification_time(&metadata);
                if let Err(e) = filetime::set_symlink_file_times(&target, atime, mtime) {
                    tracing::warn!(path = %target.display(), error = %e, "failed to set link times");
                }
            }
        }
        Ok(())
    }

    fn on_failure(&mut self, failure: Failure) {
        self.failures.record(failure);
    }

    fn on_finish(&mut self) {
        if self.interrupted {
            return;
        }
        // Children are all in place, so directory times no longer change.
        for (path, mtime) in self.directory_times.drain(..).rev() {
            if let Err(e) = filetime::set_file_mtime(&path, mtime) {
                tracing::warn!(path = %path.display(), error = %e, "failed to set modification time");
            }
        }
    }
}

#[cfg(unix)]
fn create_symlink(link: &Path, _source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn create_symlink(link: &Path, source: &Path, target: &Path) -> io::Result<()> {
    // Windows needs to know whether the link points at a directory.
    if fs::metadata(source).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use tempfile::TempDir;

    fn small_buffer() -> OpsConfig {
        OpsConfig::builder().buffer_size(3usize).build().unwrap()
    }

    #[test]
    fn test_copy_file_into_directory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, b"hello world").unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let summary = Copy::with_config([&source], &dest, small_buffer())
            .execute(&NeverCancel)
            .unwrap();

        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"hello world");
        assert_eq!(summary.items, 1);
        assert_eq!(summary.bytes, 11);
        assert!(source.exists());
    }

    #[test]
    fn test_copy_empty_directory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("empty");
        fs::create_dir(&source).unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let summary = Copy::new([&source], &dest).execute(&NeverCancel).unwrap();

        assert!(dest.join("empty").is_dir());
        assert_eq!(summary.items, 1);
        assert_eq!(summary.bytes, 0);
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dir");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("f"), b"x").unwrap();
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(source.join("f"), old).unwrap();
        filetime::set_file_mtime(&source, old).unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        Copy::new([&source], &dest).execute(&NeverCancel).unwrap();

        let file_meta = fs::metadata(dest.join("dir/f")).unwrap();
        let dir_meta = fs::metadata(dest.join("dir")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&file_meta), old);
        assert_eq!(FileTime::from_last_modification_time(&dir_meta), old);
    }

    #[test]
    fn test_cancelled_mid_file_removes_partial_copy() {
        use std::cell::Cell;

        struct CancelAfter(Cell<u32>);
        impl Cancellable for CancelAfter {
            fn is_cancelled(&self) -> bool {
                let left = self.0.get();
                if left == 0 {
                    return true;
                }
                self.0.set(left - 1);
                false
            }
        }

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("big.bin");
        fs::write(&source, vec![7u8; 30]).unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        // Polls: root loop, traversal head, then two chunks before tripping.
        let cancel = CancelAfter(Cell::new(4));
        let copy = Copy::with_config([&source], &dest, small_buffer());
        let progress = copy.progress();
        let summary = copy.execute(&cancel).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.items, 0);
        assert_eq!(progress.byte_count(), 6);
        assert!(!dest.join("big.bin").exists());
        assert!(progress.is_done());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_copied_as_link() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tree");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("real.txt"), b"data").unwrap();
        std::os::unix::fs::symlink("real.txt", source.join("link")).unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let summary = Copy::new([&source], &dest).execute(&NeverCancel).unwrap();

        let copied = dest.join("tree/link");
        assert!(fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&copied).unwrap(), PathBuf::from("real.txt"));
        assert_eq!(summary.items, 3);
        assert_eq!(summary.bytes, 4);
    }

    #[test]
    fn test_target_of_maps_relative_paths() {
        let temp = TempDir::new().unwrap();
        let config = OpsConfig::default();
        let progress = Progress::new(OperationType::Copy);
        let mut copier = TreeCopier::new(&config, &NeverCancel, &progress);
        let mut failures = FailureRecorder::new(progress.clone());
        let visitor = CopyVisitor {
            source_root: Path::new("/src/tree"),
            target_root: &temp.path().join("out"),
            copier: &mut copier,
            failures: &mut failures,
            directory_times: Vec::new(),
            interrupted: false,
        };

        assert_eq!(visitor.target_of(Path::new("/src/tree")), temp.path().join("out"));
        assert_eq!(
            visitor.target_of(Path::new("/src/tree/a/b.txt")),
            temp.path().join("out/a/b.txt")
        );
    }
}
