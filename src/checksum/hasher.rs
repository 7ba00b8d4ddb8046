//! Content hashers.
//!
//! # Overview
//!
//! [`ContentHasher`] is the seam between the checksum backend and the
//! thing that actually reads bytes. Two implementations ship:
//!
//! - [`Blake3Hasher`]: in-process BLAKE3, streaming small files and
//!   memory-mapping large ones
//! - [`ExternalHasher`]: runs `<tool> <absolute path>` and takes the first
//!   whitespace-separated token of its output (`md5sum`, large-file tools)

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::HashError;

/// Files at or above this size are memory-mapped by [`Blake3Hasher`].
pub const DEFAULT_MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Computes a digest over the full content of one file.
pub trait ContentHasher: fmt::Debug {
    /// Hash the file at `path`, returning the digest as text.
    ///
    /// # Errors
    ///
    /// [`HashError::FileUnavailable`] when the file cannot be opened;
    /// other variants for read or tool failures.
    fn hash_file(&self, path: &Path) -> Result<String, HashError>;

    /// Short name used in log messages.
    fn name(&self) -> String;
}

/// In-process BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Blake3Hasher {
    use_mmap: bool,
    mmap_threshold: u64,
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Blake3Hasher {
    /// Create a hasher with memory-mapping enabled at the default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Enable or disable memory-mapped reads.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Set the size at which files are memory-mapped.
    #[must_use]
    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let file = File::open(path).map_err(|source| HashError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let io_err = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = file.metadata().map_err(io_err)?.len();

        let mut hasher = blake3::Hasher::new();
        if self.use_mmap && size >= self.mmap_threshold {
            log::trace!("Memory-mapping {} for hashing", path.display());
            hasher.update_mmap(path).map_err(io_err)?;
        } else {
            hasher.update_reader(file).map_err(io_err)?;
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    fn name(&self) -> String {
        "blake3".to_string()
    }
}

/// Hasher that shells out to an external tool.
///
/// The tool is invoked as `<tool> <path>` and must print the digest as the
/// first whitespace-separated token on stdout.
#[derive(Debug, Clone)]
pub struct ExternalHasher {
    tool: PathBuf,
}

impl ExternalHasher {
    /// Wrap the tool at `tool`.
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Path of the wrapped tool.
    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    fn failure(&self, path: &Path, reason: impl Into<String>) -> HashError {
        HashError::ExternalHasherFailure {
            tool: self.tool.clone(),
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl ContentHasher for ExternalHasher {
    fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let output = Command::new(&self.tool)
            .arg(path)
            .output()
            .map_err(|e| self.failure(path, format!("could not run: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(
                path,
                format!("{} ({})", output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // md5sum prefixes a backslash when it had to escape the filename
        let token = stdout
            .split_whitespace()
            .next()
            .map(|t| t.trim_start_matches('\\'))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.failure(path, "no digest in output"))?;

        Ok(token.to_string())
    }

    fn name(&self) -> String {
        self.tool.display().to_string()
    }
}
