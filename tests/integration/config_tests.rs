use figment::providers::Serialized;
use once_only::config::{Config, DigestBackend};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("ONCE_ONLY_TEST_LARGE_FILE_THRESHOLD", "1000");
    std::env::set_var("ONCE_ONLY_TEST_DIGEST", "external");

    use figment::{providers::Env, Figment};
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("ONCE_ONLY_TEST_"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.large_file_threshold, 1000);
    assert_eq!(config.digest, DigestBackend::External);

    std::env::remove_var("ONCE_ONLY_TEST_LARGE_FILE_THRESHOLD");
    std::env::remove_var("ONCE_ONLY_TEST_DIGEST");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
large_file_hasher = "/opt/bin/pfff"
large_file_threshold = 50000000
manifest_prefix = "pipeline"
cache_dir = "/var/cache/once-only"
precalculated = ["/data/hashes.md5"]
skip_regex = ['\.log$']
"#,
    )
    .unwrap();

    let config = Config::load(Some(config_path.as_path())).unwrap();
    assert_eq!(config.large_file_hasher, Some(PathBuf::from("/opt/bin/pfff")));
    assert_eq!(config.large_file_threshold, 50_000_000);
    assert_eq!(config.manifest_prefix, "pipeline");
    assert_eq!(config.cache_dir, PathBuf::from("/var/cache/once-only"));
    assert_eq!(config.precalculated, vec![PathBuf::from("/data/hashes.md5")]);
    assert_eq!(config.skip_regex, vec![r"\.log$".to_string()]);
    assert_eq!(config.digest, DigestBackend::Builtin);
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let result = Config::load(Some(temp_dir.path().join("absent.toml").as_path()));
    assert!(result.is_err());
}

#[test]
fn test_config_invalid_value() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "large_file_threshold = \"lots\"\n").unwrap();

    assert!(Config::load(Some(config_path.as_path())).is_err());
}
