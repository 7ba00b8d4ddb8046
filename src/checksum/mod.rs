//! Checksum module: fingerprint records and the backends that compute them.
//!
//! # Architecture
//!
//! - [`hasher`]: the [`ContentHasher`] capability and its two
//!   implementations, in-process BLAKE3 and an external hash tool
//! - [`backend`]: [`ChecksumBackend`], which picks between a precalculated
//!   value, the large-file hasher and the default hasher for each file
//!
//! # Example
//!
//! ```no_run
//! use once_only::checksum::{Blake3Hasher, ChecksumBackend};
//! use once_only::precalc::PrecalculatedIndex;
//!
//! let backend = ChecksumBackend::new(Box::new(Blake3Hasher::new()));
//! let index = PrecalculatedIndex::empty();
//!
//! for record in backend.fingerprint_files(&["a.txt", "b.txt"], &index).unwrap() {
//!     println!("{record}");
//! }
//! ```

pub mod backend;
pub mod hasher;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use backend::{ChecksumBackend, DEFAULT_LARGE_FILE_THRESHOLD};
pub use hasher::{Blake3Hasher, ContentHasher, ExternalHasher};

/// Which backend produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashKind {
    /// Default content digest
    Default,
    /// External large-file hasher
    Large,
    /// Taken from a precalculated listing
    Precalculated,
}

impl HashKind {
    /// Token written to manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Large => "LARGE",
            Self::Precalculated => "PRECALCULATED",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashKind {
    type Err = String;

    /// Accepts the current tokens and the older `MD5` / `PFFF` ones.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT" | "MD5" => Ok(Self::Default),
            "LARGE" | "PFFF" => Ok(Self::Large),
            "PRECALCULATED" => Ok(Self::Precalculated),
            other => Err(format!("unknown hash kind '{other}'")),
        }
    }
}

/// The fingerprint of one file.
///
/// `Display` renders the manifest line form `kind<TAB>value<TAB>path`,
/// which is also what the cache key is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Backend that produced `value`
    pub kind: HashKind,
    /// Lowercase hex digest, or the token the backend printed
    pub value: String,
    /// Absolute path of the file
    pub path: PathBuf,
}

impl FingerprintRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(kind: HashKind, value: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            value: value.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for FingerprintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.kind, self.value, self.path.display())
    }
}

/// Errors that can occur while fingerprinting a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file is missing or cannot be opened.
    #[error("File {path} is not available: {source}")]
    FileUnavailable {
        /// Path that could not be opened
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The external hash tool failed or printed nothing usable.
    #[error("Hash tool {tool} failed on {path}: {reason}")]
    ExternalHasherFailure {
        /// Tool that was run
        tool: PathBuf,
        /// File it was run on
        path: PathBuf,
        /// Exit status, stderr or parse problem
        reason: String,
    },

    /// A LARGE record needs re-hashing but no large-file hasher is set.
    #[error("No large-file hasher configured to verify {0}")]
    LargeHasherUnavailable(PathBuf),

    /// Reading the file failed after it was opened.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
