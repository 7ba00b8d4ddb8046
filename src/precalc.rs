//! Precalculated checksum listings.
//!
//! A listing is an `md5sum`-style text file (`<hash>  <filename>` per
//! line) with a `.md5` extension. Filenames resolve relative to the
//! listing's own directory. Each entry remembers the listing's mtime: the
//! value may only be trusted while the target file is older than that.
//!
//! # Example
//!
//! ```no_run
//! use once_only::precalc::PrecalculatedIndex;
//!
//! let index = PrecalculatedIndex::load(&["data/hashes.md5"]).unwrap();
//! println!("{} precalculated entries", index.len());
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::path_utils::{absolute_path, expand_path};

/// Extension every listing file must carry.
pub const LISTING_EXTENSION: &str = "md5";

/// Errors raised while loading listing files.
#[derive(thiserror::Error, Debug)]
pub enum PrecalcError {
    /// The listing does not carry the `.md5` extension.
    #[error("Precalculated hash file should have .md5 extension: {0}")]
    InvalidExtension(PathBuf),

    /// A line did not hold a hash and a filename.
    #[error("Malformed record in {path} at line {line}")]
    MalformedRecord {
        /// Listing file
        path: PathBuf,
        /// 1-based line number
        line: usize,
    },

    /// The listing could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Listing file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// One precalculated hash, tagged with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecalculatedEntry {
    /// Hash value as written in the listing
    pub hash_value: String,
    /// Modification time of the listing file, not of the target
    pub source_mtime: SystemTime,
}

impl PrecalculatedEntry {
    /// Whether a target last modified at `target_mtime` can use this entry.
    ///
    /// The target must be strictly older than the listing.
    #[must_use]
    pub fn is_fresh_for(&self, target_mtime: SystemTime) -> bool {
        target_mtime < self.source_mtime
    }
}

/// Absolute target path to precalculated entry.
///
/// Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct PrecalculatedIndex {
    entries: HashMap<PathBuf, PrecalculatedEntry>,
}

impl PrecalculatedIndex {
    /// An index with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load listing files in order. A later listing overrides an earlier
    /// one for the same target.
    ///
    /// # Errors
    ///
    /// Any listing without the `.md5` extension, any unreadable listing
    /// and any malformed line aborts the whole load.
    pub fn load<P: AsRef<Path>>(files: &[P]) -> Result<Self, PrecalcError> {
        let mut entries = HashMap::new();

        for file in files {
            let file = file.as_ref();
            if file.extension().and_then(|e| e.to_str()) != Some(LISTING_EXTENSION) {
                return Err(PrecalcError::InvalidExtension(file.to_path_buf()));
            }

            let io_err = |source| PrecalcError::Io {
                path: file.to_path_buf(),
                source,
            };
            let source_mtime = fs::metadata(file).and_then(|m| m.modified()).map_err(io_err)?;
            let content = fs::read_to_string(file).map_err(io_err)?;

            let listing_dir = absolute_path(file)
                .map_err(io_err)?
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();

            let before = entries.len();
            for (idx, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let (hash_value, filename) =
                    parse_listing_line(line).ok_or_else(|| PrecalcError::MalformedRecord {
                        path: file.to_path_buf(),
                        line: idx + 1,
                    })?;
                entries.insert(
                    expand_path(Path::new(filename), &listing_dir),
                    PrecalculatedEntry {
                        hash_value: hash_value.to_string(),
                        source_mtime,
                    },
                );
            }
            log::debug!(
                "Loaded precalculated listing {} ({} new targets)",
                file.display(),
                entries.len() - before
            );
        }

        Ok(Self { entries })
    }

    /// Look up the entry for an absolute target path.
    #[must_use]
    pub fn get(&self, absolute: &Path) -> Option<&PrecalculatedEntry> {
        self.entries.get(absolute)
    }

    /// Look up an entry and return it only while it is still fresh.
    #[must_use]
    pub fn fresh_entry(
        &self,
        absolute: &Path,
        target_mtime: SystemTime,
    ) -> Option<&PrecalculatedEntry> {
        self.get(absolute)
            .filter(|entry| entry.is_fresh_for(target_mtime))
    }

    /// Number of targets in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no listing contributed any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `<hash> <filename>`. The filename is the rest of the line and may
/// hold spaces; md5sum's binary-mode `*` marker is dropped.
fn parse_listing_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let split = line.find(char::is_whitespace)?;
    let (hash, rest) = line.split_at(split);
    let rest = rest.trim_start();
    let filename = rest.strip_prefix('*').unwrap_or(rest);
    (!filename.is_empty()).then_some((hash, filename))
}
