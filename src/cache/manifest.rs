//! Manifest file codec.
//!
//! A manifest is line-oriented text:
//!
//! ```text
//! <kind>\t<value>\t<path>      input records, one per line
//! # OUTPUT
//! <kind>\t<value>\t<path>      output records, one per line
//! ```
//!
//! `# OUTPUT` switches to the output section. Any other line starting with
//! `#` is a comment. A manifest written before the command ran has no
//! output section at all.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::ManifestError;
use crate::checksum::{FingerprintRecord, HashKind};

/// Line separating the input and output sections.
pub const OUTPUT_SENTINEL: &str = "# OUTPUT";

/// Mode of written manifests: readable by every user of a shared cache
/// directory.
#[cfg(unix)]
pub const MANIFEST_MODE: u32 = 0o644;

/// Recorded fingerprints of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Input records in file order
    pub inputs: Vec<FingerprintRecord>,
    /// Output records; `None` when the manifest has no output section
    pub outputs: Option<Vec<FingerprintRecord>>,
}

impl Manifest {
    /// Create a manifest from its sections.
    #[must_use]
    pub fn new(inputs: Vec<FingerprintRecord>, outputs: Option<Vec<FingerprintRecord>>) -> Self {
        Self { inputs, outputs }
    }

    /// Output records, empty when no section was recorded.
    #[must_use]
    pub fn outputs(&self) -> &[FingerprintRecord] {
        self.outputs.as_deref().unwrap_or_default()
    }

    /// Render the manifest text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for record in &self.inputs {
            text.push_str(&record.to_string());
            text.push('\n');
        }
        if let Some(outputs) = &self.outputs {
            text.push_str(OUTPUT_SENTINEL);
            text.push('\n');
            for record in outputs {
                text.push_str(&record.to_string());
                text.push('\n');
            }
        }
        text
    }

    /// Parse manifest text. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// [`ManifestError::InvalidFormat`] for a data line without three
    /// tab-separated fields or with an unknown kind token.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ManifestError> {
        let mut manifest = Self::default();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim_end() == OUTPUT_SENTINEL {
                manifest.outputs.get_or_insert_with(Vec::new);
                continue;
            }
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let record = parse_record(line).map_err(|reason| ManifestError::InvalidFormat {
                path: origin.to_path_buf(),
                line: idx + 1,
                reason,
            })?;
            match manifest.outputs.as_mut() {
                Some(outputs) => outputs.push(record),
                None => manifest.inputs.push(record),
            }
        }

        Ok(manifest)
    }
}

fn parse_record(line: &str) -> Result<FingerprintRecord, String> {
    let mut fields = line.splitn(3, '\t');
    let (Some(kind), Some(value), Some(path)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err("expected <kind>\\t<value>\\t<path>".to_string());
    };
    if value.is_empty() || path.is_empty() {
        return Err("empty value or path".to_string());
    }
    let kind: HashKind = kind.parse()?;
    Ok(FingerprintRecord::new(kind, value, PathBuf::from(path)))
}

/// Write a manifest to `path`.
///
/// Passing `None` for `outputs` writes an input-only manifest. The file is
/// written to a temporary sibling and renamed into place, so readers never
/// see a half-written manifest.
///
/// # Errors
///
/// [`ManifestError::Io`] if the directory is not writable.
pub fn write_manifest(
    path: &Path,
    inputs: &[FingerprintRecord],
    outputs: Option<&[FingerprintRecord]>,
) -> Result<(), ManifestError> {
    let manifest = Manifest::new(inputs.to_vec(), outputs.map(<[_]>::to_vec));
    let io_err = |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer
            .write_all(manifest.to_text().as_bytes())
            .map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(MANIFEST_MODE))
            .map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    log::debug!(
        "Wrote manifest {} ({} inputs, {} outputs)",
        path.display(),
        manifest.inputs.len(),
        manifest.outputs().len()
    );
    Ok(())
}

/// Read a manifest from `path`.
///
/// # Errors
///
/// [`ManifestError::Io`] if the file cannot be read,
/// [`ManifestError::InvalidFormat`] for a malformed line.
pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Manifest::parse(&text, path)
}
