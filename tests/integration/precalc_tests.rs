use filetime::{set_file_mtime, FileTime};
use once_only::checksum::{ChecksumBackend, ContentHasher, HashError, HashKind};
use once_only::path_utils::absolute_path;
use once_only::precalc::{PrecalcError, PrecalculatedIndex};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Default hasher that records every file it is asked to read.
#[derive(Debug, Clone, Default)]
struct RecordingHasher {
    reads: Rc<Cell<usize>>,
}

impl ContentHasher for RecordingHasher {
    fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        self.reads.set(self.reads.get() + 1);
        let bytes = fs::read(path).map_err(|source| HashError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(format!("len{}", bytes.len()))
    }

    fn name(&self) -> String {
        "recording".to_string()
    }
}

/// `out.bin` plus a `hashes.md5` listing for it; target mtime set to
/// `target_offset` seconds relative to the listing's mtime.
fn setup(target_offset: i64) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("out.bin");
    let listing = dir.path().join("hashes.md5");
    fs::write(&target, b"payload").unwrap();
    fs::write(&listing, "deadbeef  out.bin\n").unwrap();

    let base = 1_700_000_000;
    set_file_mtime(&listing, FileTime::from_unix_time(base, 0)).unwrap();
    set_file_mtime(&target, FileTime::from_unix_time(base + target_offset, 0)).unwrap();
    (dir, target, listing)
}

#[test]
fn test_fresh_entry_skips_file_reads() {
    let (_dir, target, listing) = setup(-60);
    let index = PrecalculatedIndex::load(&[&listing]).unwrap();

    let hasher = RecordingHasher::default();
    let backend = ChecksumBackend::new(Box::new(hasher.clone()));
    let record = backend.compute_fingerprint(&target, &index).unwrap();

    assert_eq!(record.kind, HashKind::Precalculated);
    assert_eq!(record.value, "deadbeef");
    assert_eq!(record.path, absolute_path(&target).unwrap());
    assert_eq!(hasher.reads.get(), 0);
}

#[test]
fn test_stale_entry_is_recomputed() {
    let (_dir, target, listing) = setup(60);
    let index = PrecalculatedIndex::load(&[&listing]).unwrap();

    let hasher = RecordingHasher::default();
    let backend = ChecksumBackend::new(Box::new(hasher.clone()));
    let record = backend.compute_fingerprint(&target, &index).unwrap();

    assert_eq!(record.kind, HashKind::Default);
    assert_eq!(record.value, "len7");
    assert_eq!(hasher.reads.get(), 1);
}

#[test]
fn test_equal_mtime_is_stale() {
    let (_dir, target, listing) = setup(0);
    let index = PrecalculatedIndex::load(&[&listing]).unwrap();

    let backend = ChecksumBackend::new(Box::new(RecordingHasher::default()));
    let record = backend.compute_fingerprint(&target, &index).unwrap();
    assert_eq!(record.kind, HashKind::Default);
}

#[test]
fn test_relative_target_path_matches_index() {
    let (dir, _target, listing) = setup(-60);
    let index = PrecalculatedIndex::load(&[&listing]).unwrap();

    // Same file reached through a non-normalized path
    let odd = dir.path().join(".").join("sub").join("..").join("out.bin");
    fs::create_dir(dir.path().join("sub")).unwrap();

    let backend = ChecksumBackend::new(Box::new(RecordingHasher::default()));
    let record = backend.compute_fingerprint(&odd, &index).unwrap();
    assert_eq!(record.kind, HashKind::Precalculated);
}

#[test]
fn test_unlisted_file_uses_default() {
    let (dir, _target, listing) = setup(-60);
    let other = dir.path().join("other.bin");
    fs::write(&other, b"abc").unwrap();
    let index = PrecalculatedIndex::load(&[&listing]).unwrap();

    let backend = ChecksumBackend::new(Box::new(RecordingHasher::default()));
    let record = backend.compute_fingerprint(&other, &index).unwrap();
    assert_eq!(record.kind, HashKind::Default);
    assert_eq!(record.value, "len3");
}

#[test]
fn test_missing_listing_is_io_error() {
    let err = PrecalculatedIndex::load(&["/nonexistent/dir/hashes.md5"]).unwrap_err();
    assert!(matches!(err, PrecalcError::Io { .. }));
}

#[test]
fn test_wrong_extension_names_file() {
    let dir = TempDir::new().unwrap();
    let listing = dir.path().join("hashes.sha1");
    fs::write(&listing, "aa  x\n").unwrap();

    let err = PrecalculatedIndex::load(&[&listing]).unwrap_err();
    assert!(err.to_string().contains("hashes.sha1"));
    assert!(err.to_string().contains(".md5"));
}
