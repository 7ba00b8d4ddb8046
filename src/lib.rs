//! Once-only - checksum-based command memoization
//!
//! The change-detection and cache-key layer under a once-only wrapper:
//! pick the files out of a command line, fingerprint them, name a manifest
//! after the fingerprints, and later verify the outputs recorded in it.
//!
//! # Example
//!
//! ```no_run
//! use once_only::cache::{check_outputs_still_valid, derive_manifest_name, write_manifest};
//! use once_only::checksum::{Blake3Hasher, ChecksumBackend};
//! use once_only::precalc::PrecalculatedIndex;
//! use once_only::selector::select_existing_files;
//! use std::path::Path;
//!
//! let files = select_existing_files(&["sort", "-o", "out.txt", "in.txt"]);
//! let backend = ChecksumBackend::new(Box::new(Blake3Hasher::new()));
//! let inputs = backend.fingerprint_files(&files, &PrecalculatedIndex::empty()).unwrap();
//!
//! let name = derive_manifest_name(&inputs, "once-only");
//! if Path::new(&name).exists()
//!     && check_outputs_still_valid(Path::new(&name), &backend).unwrap().is_none()
//! {
//!     println!("cache hit");
//! } else {
//!     // run the command, then:
//!     let outputs = backend
//!         .fingerprint_files(&["out.txt"], &PrecalculatedIndex::empty())
//!         .unwrap();
//!     write_manifest(Path::new(&name), &inputs, Some(outputs.as_slice())).unwrap();
//! }
//! ```

pub mod cache;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod path_utils;
pub mod precalc;
pub mod selector;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cache::{derive_manifest_name, find_first_divergent_output, write_manifest};
use crate::checksum::{ChecksumBackend, FingerprintRecord};
use crate::cli::{Cli, Commands, CommandLineArgs, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::precalc::PrecalculatedIndex;
use crate::selector::{apply_filters, ensure_files_exist, select_existing_files, FileFilter};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Any fatal condition: missing declared input, unreadable or malformed
/// listing/manifest, hash tool failure, invalid configuration.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli.backend);

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Select(args) => {
            for file in selected_files(&config, &args)? {
                println!("{file}");
            }
            Ok(ExitCode::Success)
        }
        Commands::Fingerprint(args) => {
            let session = Session::open(&config)?;
            let records = session.fingerprint(&selected_files(&config, &args.command_line)?)?;
            match args.format {
                OutputFormat::Text => records.iter().for_each(|r| println!("{r}")),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
            Ok(ExitCode::Success)
        }
        Commands::Name(args) => {
            let session = Session::open(&config)?;
            let inputs = session.fingerprint(&selected_files(&config, &args)?)?;
            println!("{}", derive_manifest_name(&inputs, &config.manifest_prefix));
            Ok(ExitCode::Success)
        }
        Commands::Record(args) => {
            let session = Session::open(&config)?;
            let inputs = session.fingerprint(&selected_files(&config, &args.command_line)?)?;

            let outputs = if args.outputs.is_empty() {
                None
            } else {
                ensure_files_exist(&path_strings(&args.outputs))?;
                Some(
                    session
                        .fingerprint_outputs(&args.outputs)
                        .context("Fingerprinting outputs")?,
                )
            };

            let path = session.manifest_path(&inputs);
            write_manifest(&path, &inputs, outputs.as_deref())?;
            println!("{}", path.display());
            Ok(ExitCode::Success)
        }
        Commands::Verify(args) => {
            let session = Session::open(&config)?;
            let divergence = find_first_divergent_output(&args.manifest, &session.backend)?;
            if args.format == OutputFormat::Json {
                let report = serde_json::json!({
                    "manifest": args.manifest,
                    "valid": divergence.is_none(),
                    "divergent": divergence.as_ref().map(|d| &d.path),
                    "reason": divergence.as_ref().map(ToString::to_string),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if let Some(d) = &divergence {
                println!("{}", d.path.display());
            }
            Ok(match divergence {
                Some(_) => ExitCode::Stale,
                None => ExitCode::Success,
            })
        }
        Commands::Check(args) => {
            let session = Session::open(&config)?;
            let inputs = session.fingerprint(&selected_files(&config, &args)?)?;
            let path = session.manifest_path(&inputs);

            if !path.exists() {
                log::info!("Cache miss: no manifest {}", path.display());
                return Ok(ExitCode::Stale);
            }
            match find_first_divergent_output(&path, &session.backend)? {
                Some(d) => {
                    log::info!("Cache stale: {}", d);
                    Ok(ExitCode::Stale)
                }
                None => {
                    log::info!("Cache hit: {}", path.display());
                    Ok(ExitCode::Success)
                }
            }
        }
    }
}

/// Backend and precalculated index resolved once per invocation.
struct Session<'a> {
    config: &'a Config,
    backend: ChecksumBackend,
    index: PrecalculatedIndex,
}

impl<'a> Session<'a> {
    fn open(config: &'a Config) -> Result<Self> {
        let backend = config.checksum_backend()?;
        log::debug!("Default digest: {}", backend.default_hasher_name());
        let index = PrecalculatedIndex::load(&config.precalculated)?;
        if !index.is_empty() {
            log::debug!("{} precalculated checksums available", index.len());
        }
        Ok(Self {
            config,
            backend,
            index,
        })
    }

    fn fingerprint<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<FingerprintRecord>> {
        Ok(self.backend.fingerprint_files(files, &self.index)?)
    }

    /// Outputs skip the precalculated index: they must be recorded with a
    /// hasher that [`ChecksumBackend::rehash`] can reproduce.
    fn fingerprint_outputs<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<FingerprintRecord>> {
        Ok(self
            .backend
            .fingerprint_files(files, &PrecalculatedIndex::empty())?)
    }

    fn manifest_path(&self, inputs: &[FingerprintRecord]) -> PathBuf {
        self.config
            .cache_dir
            .join(derive_manifest_name(inputs, &self.config.manifest_prefix))
    }
}

/// Files named by the wrapped command line, minus everything the skip
/// filters from config and flags exclude.
fn selected_files(config: &Config, args: &CommandLineArgs) -> Result<Vec<String>> {
    let mut filters = config.filters();
    filters.extend(args.skip_regex.iter().cloned().map(FileFilter::Regex));
    filters.extend(args.skip_glob.iter().cloned().map(FileFilter::Glob));

    let files = select_existing_files(&args.args);
    let partition = apply_filters(&files, &filters)?;
    log::debug!(
        "Selected {} files ({} skipped)",
        partition.kept.len(),
        partition.excluded.len()
    );
    Ok(partition.kept)
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}
