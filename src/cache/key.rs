//! Cache key derivation.
//!
//! The manifest for an invocation is named after a SHA-256 digest of its
//! input fingerprints, each rendered as its manifest line and joined with
//! `\n`. Same records in the same order give the same name on any platform.
//! Order matters: the same files listed in a different order are a
//! different key.

use sha2::{Digest, Sha256};

use crate::checksum::FingerprintRecord;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "once-only";

/// Hex SHA-256 of an arbitrary buffer.
///
/// `sha2` detects CPU support at runtime and uses the portable
/// implementation when no accelerated one is available.
#[must_use]
pub fn cache_key_hash(buf: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buf);
    format!("{:x}", hasher.finalize())
}

/// Manifest file name for a list of input fingerprints:
/// `{prefix}-{hex digest}.txt`.
#[must_use]
pub fn derive_manifest_name(records: &[FingerprintRecord], prefix: &str) -> String {
    let buf = records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}-{}.txt", prefix, cache_key_hash(buf.as_bytes()))
}
