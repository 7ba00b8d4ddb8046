//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. the user config file (`config.toml` in the platform config dir)
//! 3. a file given with `--config`
//! 4. `ONCE_ONLY_*` environment variables
//! 5. command-line flags (applied by the caller with [`Config::apply_cli`])
//!
//! The configuration also decides, once, which hashers the checksum
//! backend uses: see [`Config::checksum_backend`].

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_PREFIX;
use crate::checksum::hasher::DEFAULT_MMAP_THRESHOLD;
use crate::checksum::{
    Blake3Hasher, ChecksumBackend, ContentHasher, ExternalHasher, DEFAULT_LARGE_FILE_THRESHOLD,
};
use crate::cli::BackendArgs;
use crate::path_utils::which;
use crate::selector::FileFilter;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "ONCE_ONLY_";

/// Default content digest strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestBackend {
    /// In-process BLAKE3
    #[default]
    Builtin,
    /// External md5-style tool (`md5_tool`)
    External,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool used for files above `large_file_threshold`.
    pub large_file_hasher: Option<PathBuf>,
    /// Size in bytes above which the large-file hasher is used.
    pub large_file_threshold: u64,
    /// Default digest strategy.
    pub digest: DigestBackend,
    /// Tool run when `digest = "external"`.
    pub md5_tool: PathBuf,
    /// Files at or above this size are memory-mapped by the builtin digest.
    pub mmap_threshold: u64,
    /// Manifest file name prefix.
    pub manifest_prefix: String,
    /// Directory holding manifest files.
    pub cache_dir: PathBuf,
    /// Precalculated `.md5` listings to load.
    pub precalculated: Vec<PathBuf>,
    /// Regexes of files never fingerprinted.
    pub skip_regex: Vec<String>,
    /// Globs of files never fingerprinted.
    pub skip_glob: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            large_file_hasher: None,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            digest: DigestBackend::Builtin,
            md5_tool: PathBuf::from("md5sum"),
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            manifest_prefix: DEFAULT_PREFIX.to_string(),
            cache_dir: PathBuf::from("."),
            precalculated: Vec::new(),
            skip_regex: Vec::new(),
            skip_glob: Vec::new(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// Command-line flags are not part of this; apply them afterwards with
    /// [`Config::apply_cli`].
    ///
    /// # Arguments
    ///
    /// * `explicit` - File given with `--config`; it must exist
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use once_only::config::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load(Some(Path::new("pipeline.toml"))).unwrap();
    /// println!("manifests go to {}", config.cache_dir.display());
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if `explicit` does not exist or any source holds invalid
    /// values.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(user) = Self::user_config_path().filter(|p| p.exists()) {
            log::debug!("Reading config from {}", user.display());
            figment = figment.merge(Toml::file(user));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("Invalid configuration")
    }

    /// Platform-specific path of the user config file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "once-only", "once-only")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Override values with the flags given on the command line.
    ///
    /// Scalar flags replace the configured value when present; listings
    /// from `--precalculated` are appended to the configured ones.
    pub fn apply_cli(&mut self, args: &BackendArgs) {
        if let Some(hasher) = &args.large_file_hasher {
            self.large_file_hasher = Some(hasher.clone());
        }
        if let Some(threshold) = args.large_file_threshold {
            self.large_file_threshold = threshold;
        }
        if let Some(digest) = args.digest {
            self.digest = digest;
        }
        if let Some(dir) = &args.cache_dir {
            self.cache_dir = dir.clone();
        }
        if let Some(prefix) = &args.prefix {
            self.manifest_prefix = prefix.clone();
        }
        self.precalculated.extend(args.precalculated.iter().cloned());
    }

    /// Skip filters, regexes first.
    #[must_use]
    pub fn filters(&self) -> Vec<FileFilter> {
        self.skip_regex
            .iter()
            .cloned()
            .map(FileFilter::Regex)
            .chain(self.skip_glob.iter().cloned().map(FileFilter::Glob))
            .collect()
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Build the checksum backend, probing for the configured tools.
    ///
    /// An external digest tool that is not installed falls back to the
    /// builtin digest with a warning. A configured large-file hasher that
    /// is not installed is an error: LARGE records could not be verified
    /// without it.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use once_only::config::{Config, DigestBackend};
    ///
    /// let config = Config {
    ///     digest: DigestBackend::External,
    ///     ..Config::default()
    /// };
    /// let backend = config.checksum_backend().unwrap();
    /// println!("DEFAULT records come from {}", backend.default_hasher_name());
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if `large_file_hasher` cannot be found.
    pub fn checksum_backend(&self) -> Result<ChecksumBackend> {
        let builtin = || -> Box<dyn ContentHasher> {
            Box::new(Blake3Hasher::new().with_mmap_threshold(self.mmap_threshold))
        };

        let default_hasher: Box<dyn ContentHasher> = match self.digest {
            DigestBackend::Builtin => builtin(),
            DigestBackend::External => match which(&self.md5_tool) {
                Some(tool) => Box::new(ExternalHasher::new(tool)),
                None => {
                    let fallback = builtin();
                    log::warn!(
                        "Digest tool {} not found, using builtin {} digest; outputs recorded \
                         with {} will be reported as changed",
                        self.md5_tool.display(),
                        fallback.name(),
                        self.md5_tool.display()
                    );
                    fallback
                }
            },
        };

        let mut backend = ChecksumBackend::new(default_hasher);
        if let Some(tool) = &self.large_file_hasher {
            let resolved = which(tool).with_context(|| {
                format!("Large-file hasher {} not found", tool.display())
            })?;
            backend = backend.with_large_file_hasher(
                Box::new(ExternalHasher::new(resolved)),
                self.large_file_threshold,
            );
        }
        Ok(backend)
    }
}
