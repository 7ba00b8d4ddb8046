use once_only::cache::{read_manifest, write_manifest, ManifestError, OUTPUT_SENTINEL};
use once_only::checksum::{FingerprintRecord, HashKind};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_reads_older_manifest_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("once-only-0a1b.txt");
    fs::write(
        &path,
        "MD5\td41d8cd98f00b204e9800998ecf8427e\t/data/in.txt\n\
         # OUTPUT\n\
         PFFF\t9f3c\t/data/huge.bam\n\
         MD5\t0cc175b9c0f1b6a831c399e269772661\t/data/out.txt\n",
    )
    .unwrap();

    let m = read_manifest(&path).unwrap();
    assert_eq!(m.inputs.len(), 1);
    assert_eq!(m.inputs[0].kind, HashKind::Default);
    assert_eq!(
        m.outputs()
            .iter()
            .map(|r| (r.kind, r.path.clone()))
            .collect::<Vec<_>>(),
        vec![
            (HashKind::Large, PathBuf::from("/data/huge.bam")),
            (HashKind::Default, PathBuf::from("/data/out.txt")),
        ]
    );
}

#[test]
fn test_written_file_is_tab_separated_and_newline_terminated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.txt");
    let inputs = [FingerprintRecord::new(HashKind::Precalculated, "beef", "/x/in")];
    let outputs = [FingerprintRecord::new(HashKind::Default, "cafe", "/x/out")];

    write_manifest(&path, &inputs, Some(&outputs[..])).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["PRECALCULATED\tbeef\t/x/in", OUTPUT_SENTINEL, "DEFAULT\tcafe\t/x/out"]);
    assert!(text.ends_with('\n'));
}

#[test]
fn test_crlf_manifest_parses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.txt");
    fs::write(&path, "DEFAULT\taa\t/a\r\n# OUTPUT\r\nDEFAULT\tbb\t/b\r\n").unwrap();

    let m = read_manifest(&path).unwrap();
    assert_eq!(m.inputs[0].path, PathBuf::from("/a"));
    assert_eq!(m.outputs()[0].path, PathBuf::from("/b"));
}

#[test]
fn test_truncated_record_is_invalid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.txt");
    fs::write(&path, "DEFAULT\taa\n").unwrap();

    let err = read_manifest(&path).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidFormat { line: 1, .. }));
    assert!(err.to_string().contains("m.txt"));
}

#[test]
fn test_write_into_missing_dir_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no").join("such").join("m.txt");
    let err = write_manifest(&path, &[], None).unwrap_err();
    assert!(matches!(err, ManifestError::Io { .. }));
}

#[cfg(unix)]
#[test]
fn test_written_manifest_is_world_readable() {
    use once_only::cache::MANIFEST_MODE;
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.txt");
    let inputs = [FingerprintRecord::new(HashKind::Default, "aa", "/x/in")];
    write_manifest(&path, &inputs, None).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, MANIFEST_MODE);
    assert_eq!(mode & 0o044, 0o044);

    // Rewriting keeps the mode
    write_manifest(&path, &inputs, Some(&inputs[..])).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}
