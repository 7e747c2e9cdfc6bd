//! Destination name conflict resolution.
//!
//! Pasting never overwrites. When the destination directory already holds an
//! entry with the pasted name, a numbered variant is used instead:
//! `a.txt` becomes `a 2.txt`, then `a 3.txt`; a directory `a` becomes `a 2`.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Pick a path in `destination_dir` for an entry called `name` that does not
/// exist yet.
///
/// Files keep their extension after the number; directories get the number at
/// the very end. This is a plain check-then-use: another process creating the
/// same name between this call and the write is not guarded against.
///
/// Fails when a candidate cannot be checked at all, for example because the
/// numbered name is longer than the filesystem allows.
pub fn resolve_conflict(destination_dir: &Path, name: &OsStr, is_dir: bool) -> io::Result<PathBuf> {
    let (mut base, extension) = split_name(name, is_dir);

    loop {
        let mut candidate = base.clone();
        candidate.push(&extension);
        let path = destination_dir.join(&candidate);
        if is_free(&path)? {
            return Ok(path);
        }
        base = increment(&base);
    }
}

/// Whether nothing, not even a dangling link, exists at `path`.
fn is_free(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

/// Split into the part that gets numbered and the part kept after it.
fn split_name(name: &OsStr, is_dir: bool) -> (OsString, OsString) {
    if is_dir {
        return (name.to_owned(), OsString::new());
    }

    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) => {
            let mut suffix = OsString::from(".");
            suffix.push(extension);
            (stem.to_owned(), suffix)
        }
        _ => (name.to_owned(), OsString::new()),
    }
}

/// "a" -> "a 2", "a 2" -> "a 3", "" -> "2".
fn increment(base: &OsStr) -> OsString {
    if base.is_empty() {
        return OsString::from("2");
    }

    if let Some(text) = base.to_str() {
        let prefix = text.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &text[prefix.len()..];
        if !digits.is_empty() && prefix.ends_with(char::is_whitespace) {
            if let Some(next) = digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                return OsString::from(format!("{prefix}{next}"));
            }
        }
    }

    let mut next = base.to_owned();
    next.push(" 2");
    next
}
