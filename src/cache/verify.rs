//! Output verification.
//!
//! Re-hashes the output section of a manifest and reports the first output
//! that is missing or no longer matches. A divergence is a normal result:
//! it means the cached run is stale and the command must run again.

use std::fmt;
use std::path::{Path, PathBuf};

use super::manifest::{read_manifest, Manifest};
use super::ManifestError;
use crate::checksum::{ChecksumBackend, HashError};

/// Why an output no longer matches its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DivergenceReason {
    /// The file is gone (or vanished while it was being hashed)
    Missing,
    /// The file hashes to a different value
    Changed {
        /// Value in the manifest
        expected: String,
        /// Value computed now
        actual: String,
    },
}

/// First output that invalidates a cached run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Recorded path of the output
    pub path: PathBuf,
    /// What was wrong with it
    pub reason: DivergenceReason,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DivergenceReason::Missing => write!(f, "{} is missing", self.path.display()),
            DivergenceReason::Changed { expected, actual } => write!(
                f,
                "{} changed (recorded {}, now {})",
                self.path.display(),
                expected,
                actual
            ),
        }
    }
}

/// Errors that stop verification before a verdict is reached.
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// The manifest could not be read or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// An output could not be re-hashed for a reason other than being gone.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Check the outputs of an already parsed manifest, stopping at the first
/// divergence.
///
/// # Errors
///
/// Hasher failures other than a missing file.
pub fn first_divergent_output(
    manifest: &Manifest,
    backend: &ChecksumBackend,
) -> Result<Option<Divergence>, HashError> {
    for record in manifest.outputs() {
        let missing = || Divergence {
            path: record.path.clone(),
            reason: DivergenceReason::Missing,
        };

        if !record.path.exists() {
            log::info!("Output {} is missing", record.path.display());
            return Ok(Some(missing()));
        }

        let actual = match backend.rehash(record) {
            Ok(value) => value,
            Err(HashError::FileUnavailable { .. }) => return Ok(Some(missing())),
            Err(e) => return Err(e),
        };

        if actual != record.value {
            log::info!("Output {} changed since it was recorded", record.path.display());
            return Ok(Some(Divergence {
                path: record.path.clone(),
                reason: DivergenceReason::Changed {
                    expected: record.value.clone(),
                    actual,
                },
            }));
        }
    }
    Ok(None)
}

/// Read the manifest at `manifest_path` and find its first divergent output.
///
/// `Ok(None)` means every recorded output is present and unchanged.
///
/// # Errors
///
/// See [`VerifyError`].
pub fn find_first_divergent_output(
    manifest_path: &Path,
    backend: &ChecksumBackend,
) -> Result<Option<Divergence>, VerifyError> {
    let manifest = read_manifest(manifest_path)?;
    Ok(first_divergent_output(&manifest, backend)?)
}

/// Path of the first output that is missing or changed, if any.
///
/// # Errors
///
/// See [`VerifyError`].
pub fn check_outputs_still_valid(
    manifest_path: &Path,
    backend: &ChecksumBackend,
) -> Result<Option<PathBuf>, VerifyError> {
    Ok(find_first_divergent_output(manifest_path, backend)?.map(|d| d.path))
}
