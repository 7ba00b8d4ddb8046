//! Manifest cache for once-only invocations.
//!
//! Each invocation that ran is remembered by one manifest file in the
//! cache directory, recording the fingerprints of its inputs and outputs.
//!
//! # Architecture
//!
//! * [`key`]: derives the manifest file name from the input fingerprints.
//! * [`manifest`]: reads and writes the manifest text format.
//! * [`verify`]: re-hashes recorded outputs to detect drift.
//!
//! # Cache Invalidation
//!
//! A run is reusable when:
//! * its input fingerprints produce the name of an existing manifest, and
//! * every output recorded in that manifest still exists and re-hashes to
//!   the recorded value.
//!
//! No locking is done. Two processes writing the same manifest race and the
//! last rename wins.

pub mod key;
pub mod manifest;
pub mod verify;

use std::path::PathBuf;

pub use key::{cache_key_hash, derive_manifest_name, DEFAULT_PREFIX};
#[cfg(unix)]
pub use manifest::MANIFEST_MODE;
pub use manifest::{read_manifest, write_manifest, Manifest, OUTPUT_SENTINEL};
pub use verify::{
    check_outputs_still_valid, find_first_divergent_output, first_divergent_output, Divergence,
    DivergenceReason, VerifyError,
};

/// Errors that can occur while reading or writing a manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// A data line could not be parsed.
    #[error("Invalid manifest {path} at line {line}: {reason}")]
    InvalidFormat {
        /// Manifest file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// The manifest could not be read or written.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Manifest file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
