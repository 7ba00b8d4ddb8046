//! Path helpers shared by the selector, the precalculated index and the
//! checksum backend.
//!
//! Fingerprint records and precalculated entries are keyed by absolute
//! path. Both sides must produce the same key for the same file, so every
//! absolute path in this crate goes through [`expand_path`].
//!
//! # Example
//!
//! ```
//! use once_only::path_utils::expand_path;
//! use std::path::{Path, PathBuf};
//!
//! let p = expand_path(Path::new("../data/./a.txt"), Path::new("/work/run"));
//! assert_eq!(p, PathBuf::from("/work/data/a.txt"));
//! ```

use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` and normalize it lexically.
///
/// `.` components are dropped and `..` pops the previous component.
/// Symlinks are not resolved, so the result names the path the user gave,
/// not its target.
#[must_use]
pub fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `path` against the current working directory.
///
/// # Errors
///
/// Fails only when the working directory itself cannot be determined.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(expand_path(path, Path::new("/")));
    }
    Ok(expand_path(path, &env::current_dir()?))
}

/// Locate an executable by name on `PATH`.
///
/// A name containing a path separator is checked as given.
#[must_use]
pub fn which(binary: &Path) -> Option<PathBuf> {
    if binary.components().count() > 1 {
        return binary.is_file().then(|| binary.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
