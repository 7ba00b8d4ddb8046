//! Backend selection for each fingerprinted file.
//!
//! For every file the backend tries, in order:
//!
//! 1. a fresh entry in the [`PrecalculatedIndex`] (no content read at all)
//! 2. the large-file hasher, when one is configured and the file is
//!    bigger than the threshold
//! 3. the default hasher
//!
//! Verification re-hashes a recorded fingerprint with the hasher matching
//! its [`HashKind`], see [`ChecksumBackend::rehash`].

use std::fs;
use std::path::Path;

use bytesize::ByteSize;

use super::hasher::ContentHasher;
use super::{FingerprintRecord, HashError, HashKind};
use crate::path_utils::absolute_path;
use crate::precalc::PrecalculatedIndex;

/// Size above which the large-file hasher takes over (20 MB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 20_000_000;

/// Chooses and runs the hasher for each file.
#[derive(Debug)]
pub struct ChecksumBackend {
    default_hasher: Box<dyn ContentHasher>,
    large_hasher: Option<Box<dyn ContentHasher>>,
    large_file_threshold: u64,
}

impl ChecksumBackend {
    /// Create a backend with only a default hasher.
    #[must_use]
    pub fn new(default_hasher: Box<dyn ContentHasher>) -> Self {
        Self {
            default_hasher,
            large_hasher: None,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }

    /// Use `hasher` for files larger than `threshold` bytes.
    #[must_use]
    pub fn with_large_file_hasher(mut self, hasher: Box<dyn ContentHasher>, threshold: u64) -> Self {
        self.large_hasher = Some(hasher);
        self.large_file_threshold = threshold;
        self
    }

    /// Name of the hasher that produces DEFAULT records, as it appears in
    /// log messages.
    #[must_use]
    pub fn default_hasher_name(&self) -> String {
        self.default_hasher.name()
    }

    /// Current large-file threshold in bytes.
    #[must_use]
    pub fn large_file_threshold(&self) -> u64 {
        self.large_file_threshold
    }

    /// Fingerprint a single file.
    ///
    /// The record's path is the absolute form of `path`.
    ///
    /// # Errors
    ///
    /// [`HashError::FileUnavailable`] if the file does not exist or cannot
    /// be opened; hasher errors are passed through.
    pub fn compute_fingerprint(
        &self,
        path: &Path,
        index: &PrecalculatedIndex,
    ) -> Result<FingerprintRecord, HashError> {
        let unavailable = |source| HashError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let absolute = absolute_path(path).map_err(unavailable)?;
        let metadata = fs::metadata(&absolute).map_err(unavailable)?;

        if let Some(entry) = metadata
            .modified()
            .ok()
            .and_then(|mtime| index.fresh_entry(&absolute, mtime))
        {
            log::info!("Precalculated {}", path.display());
            return Ok(FingerprintRecord::new(
                HashKind::Precalculated,
                entry.hash_value.clone(),
                absolute,
            ));
        }

        if let Some(large) = self.large_hasher.as_deref() {
            if metadata.len() > self.large_file_threshold {
                log::debug!(
                    "Hashing {} ({}) with large-file hasher {}",
                    path.display(),
                    ByteSize(metadata.len()),
                    large.name()
                );
                let value = large.hash_file(&absolute)?;
                return Ok(FingerprintRecord::new(HashKind::Large, value, absolute));
            }
        }

        log::trace!("Hashing {} with {}", path.display(), self.default_hasher.name());
        let value = self.default_hasher.hash_file(&absolute)?;
        Ok(FingerprintRecord::new(HashKind::Default, value, absolute))
    }

    /// Fingerprint every file in order. The first failure aborts.
    ///
    /// # Errors
    ///
    /// The first [`HashError`] encountered.
    pub fn fingerprint_files<P: AsRef<Path>>(
        &self,
        files: &[P],
        index: &PrecalculatedIndex,
    ) -> Result<Vec<FingerprintRecord>, HashError> {
        files
            .iter()
            .map(|file| self.compute_fingerprint(file.as_ref(), index))
            .collect()
    }

    /// Recompute the value of a recorded fingerprint.
    ///
    /// LARGE records go through the large-file hasher; DEFAULT and
    /// PRECALCULATED records through the default hasher.
    ///
    /// # Errors
    ///
    /// [`HashError::LargeHasherUnavailable`] for a LARGE record when no
    /// large-file hasher is configured; hasher errors otherwise.
    pub fn rehash(&self, record: &FingerprintRecord) -> Result<String, HashError> {
        match record.kind {
            HashKind::Large => self
                .large_hasher
                .as_deref()
                .ok_or_else(|| HashError::LargeHasherUnavailable(record.path.clone()))?
                .hash_file(&record.path),
            HashKind::Default | HashKind::Precalculated => {
                self.default_hasher.hash_file(&record.path)
            }
        }
    }
}
