//! Command-line interface definitions for `once-only-check`.
//!
//! The binary exposes the change-detection core to a wrapper script: it
//! selects files from a command line, fingerprints them, names and writes
//! manifests, and verifies recorded outputs. It never runs the wrapped
//! command itself.
//!
//! # Example
//!
//! ```bash
//! # Which manifest would this command line use?
//! once-only-check name -- bwa mem ref.fa reads.fq
//!
//! # Record inputs and outputs after a successful run
//! once-only-check record --output out.sam -- bwa mem ref.fa reads.fq
//!
//! # Exit 0 on a cache hit, 2 on a miss
//! once-only-check check -- bwa mem ref.fa reads.fq
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::DigestBackend;

/// Checksum-based change detection for once-only command memoization.
///
/// Decides whether a command's earlier result can be reused by comparing
/// the current content of its input files against a recorded manifest.
#[derive(Debug, Parser)]
#[command(name = "once-only-check")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Extra configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend and cache options
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options overriding the configured checksum backend and cache location.
#[derive(Debug, Clone, Default, Args)]
pub struct BackendArgs {
    /// External tool used to hash files above the large-file threshold
    #[arg(long, global = true, value_name = "PATH")]
    pub large_file_hasher: Option<PathBuf>,

    /// Size above which the large-file hasher is used (e.g., 20MB, 1GiB)
    #[arg(long, global = true, value_name = "SIZE", value_parser = parse_size)]
    pub large_file_threshold: Option<u64>,

    /// Default digest: builtin BLAKE3 or an external md5 tool
    #[arg(long, global = true, value_enum)]
    pub digest: Option<DigestBackend>,

    /// Directory holding manifest files
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Manifest file name prefix
    #[arg(long, global = true, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Precalculated checksum listing (.md5), can be given multiple times
    #[arg(long = "precalculated", global = true, value_name = "LISTING")]
    pub precalculated: Vec<PathBuf>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the arguments that name existing files
    Select(CommandLineArgs),
    /// Print the fingerprints of the selected files
    Fingerprint(FingerprintArgs),
    /// Print the manifest file name for a command line
    Name(CommandLineArgs),
    /// Fingerprint inputs (and outputs) and write the manifest
    Record(RecordArgs),
    /// Check that the outputs recorded in a manifest are unchanged
    Verify(VerifyArgs),
    /// Exit 0 if a valid manifest exists for a command line, 2 otherwise
    Check(CommandLineArgs),
    /// Print the effective configuration
    Config,
}

/// A wrapped command line plus skip filters.
#[derive(Debug, Clone, Args)]
pub struct CommandLineArgs {
    /// Exclude files whose name matches this regex (repeatable)
    #[arg(long = "skip-regex", value_name = "REGEX")]
    pub skip_regex: Vec<String>,

    /// Exclude files matched by this glob (repeatable)
    #[arg(long = "skip-glob", value_name = "GLOB")]
    pub skip_glob: Vec<String>,

    /// The wrapped command line (put it after `--`)
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the fingerprint subcommand.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Command line to select files from
    #[command(flatten)]
    pub command_line: CommandLineArgs,
}

/// Arguments for the record subcommand.
#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Output file produced by the command (repeatable)
    #[arg(short, long = "output", value_name = "FILE")]
    pub outputs: Vec<PathBuf>,

    /// Command line to select input files from
    #[command(flatten)]
    pub command_line: CommandLineArgs,
}

/// Arguments for the verify subcommand.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Manifest file to verify
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for printed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text, one item per line
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use once_only::cli::parse_size;
///
/// assert_eq!(parse_size("20000000").unwrap(), 20_000_000);
/// assert_eq!(parse_size("20MB").unwrap(), 20_000_000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
