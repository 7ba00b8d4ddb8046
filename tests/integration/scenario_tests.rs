//! End-to-end runs of the select -> fingerprint -> name -> record -> verify
//! pipeline through the library API.

use once_only::cache::{
    cache_key_hash, check_outputs_still_valid, derive_manifest_name, read_manifest,
    write_manifest, DEFAULT_PREFIX,
};
use once_only::checksum::{Blake3Hasher, ChecksumBackend, HashError, HashKind};
use once_only::precalc::PrecalculatedIndex;
use once_only::selector::{ensure_files_exist, select_existing_files};
use std::fs;
use tempfile::TempDir;

fn backend() -> ChecksumBackend {
    ChecksumBackend::new(Box::new(Blake3Hasher::new()))
}

#[test]
fn test_two_inputs_in_order() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"first").unwrap();
    fs::write(&b, b"second").unwrap();

    let args = vec![
        "cat".to_string(),
        a.to_string_lossy().into_owned(),
        b.to_string_lossy().into_owned(),
    ];
    let files = select_existing_files(&args);
    let records = backend()
        .fingerprint_files(&files, &PrecalculatedIndex::empty())
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.kind == HashKind::Default));
    assert_eq!(records[0].path, a);
    assert_eq!(records[1].path, b);

    let joined = format!("{}\n{}", records[0], records[1]);
    assert_eq!(
        derive_manifest_name(&records, DEFAULT_PREFIX),
        format!("once-only-{}.txt", cache_key_hash(joined.as_bytes()))
    );
}

#[test]
fn test_same_content_same_name_across_runs() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    fs::write(&a, b"stable").unwrap();

    let first = backend()
        .fingerprint_files(&[&a], &PrecalculatedIndex::empty())
        .unwrap();
    let second = backend()
        .fingerprint_files(&[&a], &PrecalculatedIndex::empty())
        .unwrap();
    assert_eq!(
        derive_manifest_name(&first, DEFAULT_PREFIX),
        derive_manifest_name(&second, DEFAULT_PREFIX)
    );

    fs::write(&a, b"edited").unwrap();
    let third = backend()
        .fingerprint_files(&[&a], &PrecalculatedIndex::empty())
        .unwrap();
    assert_ne!(
        derive_manifest_name(&first, DEFAULT_PREFIX),
        derive_manifest_name(&third, DEFAULT_PREFIX)
    );
}

#[test]
fn test_changed_output_is_divergent() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.csv");
    let result = dir.path().join("result.csv");
    fs::write(&input, b"x,y\n1,2\n").unwrap();
    fs::write(&result, b"sum\n3\n").unwrap();

    let backend = backend();
    let index = PrecalculatedIndex::empty();
    let inputs = backend.fingerprint_files(&[&input], &index).unwrap();
    let outputs = backend.fingerprint_files(&[&result], &index).unwrap();
    let manifest = dir.path().join(derive_manifest_name(&inputs, DEFAULT_PREFIX));
    write_manifest(&manifest, &inputs, Some(outputs.as_slice())).unwrap();

    assert_eq!(check_outputs_still_valid(&manifest, &backend).unwrap(), None);

    fs::write(&result, b"sum\n4\n").unwrap();
    assert_eq!(
        check_outputs_still_valid(&manifest, &backend).unwrap(),
        Some(result)
    );
}

#[test]
fn test_missing_input_aborts_before_manifest() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("present.txt");
    let missing = dir.path().join("missing.txt");
    fs::write(&present, b"here").unwrap();

    let err = backend()
        .fingerprint_files(&[&present, &missing], &PrecalculatedIndex::empty())
        .unwrap_err();
    match &err {
        HashError::FileUnavailable { path, .. } => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("missing.txt"));

    let written: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("once-only-"))
        .collect();
    assert!(written.is_empty());

    let missing_str = missing.to_string_lossy().into_owned();
    assert!(ensure_files_exist(&[missing_str]).is_err());
}

#[test]
fn test_verify_twice_is_stable() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.bin");
    fs::write(&out, vec![1u8; 4096]).unwrap();

    let backend = backend();
    let outputs = backend
        .fingerprint_files(&[&out], &PrecalculatedIndex::empty())
        .unwrap();
    let manifest = dir.path().join("once-only-x.txt");
    write_manifest(&manifest, &[], Some(outputs.as_slice())).unwrap();

    assert_eq!(check_outputs_still_valid(&manifest, &backend).unwrap(), None);
    assert_eq!(check_outputs_still_valid(&manifest, &backend).unwrap(), None);
}

#[test]
fn test_record_input_only_then_append_outputs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    fs::write(&input, b"in").unwrap();

    let backend = backend();
    let index = PrecalculatedIndex::empty();
    let inputs = backend.fingerprint_files(&[&input], &index).unwrap();
    let manifest = dir.path().join(derive_manifest_name(&inputs, DEFAULT_PREFIX));

    write_manifest(&manifest, &inputs, None).unwrap();
    let m = read_manifest(&manifest).unwrap();
    assert!(m.outputs.is_none());

    fs::write(&out, b"out").unwrap();
    let outputs = backend.fingerprint_files(&[&out], &index).unwrap();
    write_manifest(&manifest, &m.inputs, Some(outputs.as_slice())).unwrap();

    let m = read_manifest(&manifest).unwrap();
    assert_eq!(m.inputs, inputs);
    assert_eq!(m.outputs(), outputs.as_slice());
}
