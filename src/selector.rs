//! File selection from a raw argument list.
//!
//! The wrapped command's arguments are a mix of flags and filenames. This
//! module picks out the ones naming real files, and partitions the result
//! with the user's skip filters (`--skip-regex`, `--skip-glob`).
//!
//! # Example
//!
//! ```no_run
//! use once_only::selector::{filter_file_list, select_existing_files};
//!
//! let args = ["tool", "-in=data.csv", "--fast", "notes.txt"];
//! let files = select_existing_files(&args);
//!
//! let partition = filter_file_list(&files, r"\.txt$").unwrap();
//! println!("hashing {:?}, skipping {:?}", partition.kept, partition.excluded);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use regex::Regex;

/// Errors raised while selecting or filtering files.
#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    /// A declared input does not exist.
    #[error("File {0} does not exist!")]
    Missing(PathBuf),

    /// A skip regex failed to compile.
    #[error("Invalid skip regex '{pattern}': {source}")]
    InvalidRegex {
        /// The offending pattern
        pattern: String,
        /// Compiler error
        #[source]
        source: regex::Error,
    },

    /// A skip glob failed to parse.
    #[error("Invalid skip glob '{pattern}': {source}")]
    InvalidGlob {
        /// The offending pattern
        pattern: String,
        /// Parser error
        #[source]
        source: glob::PatternError,
    },
}

/// Result of splitting a file list with a filter.
///
/// Both sides keep the order of the input list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Entries that passed the filter
    pub kept: Vec<String>,
    /// Entries that matched the filter and were removed
    pub excluded: Vec<String>,
}

/// A single skip filter, as given on the command line or in config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFilter {
    /// Exclude names whose basename or full string matches the regex
    Regex(String),
    /// Exclude names produced by expanding the glob
    Glob(String),
}

/// Return the arguments that resolve to an existing file, in order.
///
/// An argument counts when it is itself a file path. Otherwise, for
/// `flag=path` style arguments, the text after the first `=` is tried.
/// Anything else is dropped without error.
///
/// # Arguments
///
/// * `args` - The wrapped command line, program name included
///
/// # Example
///
/// ```rust,no_run
/// use once_only::selector::select_existing_files;
///
/// // ["in.fa", "reads.fq"] when both files exist
/// let files = select_existing_files(&["bwa", "mem", "in.fa", "--reads=reads.fq"]);
/// assert!(!files.contains(&"mem".to_string()));
/// ```
#[must_use]
pub fn select_existing_files<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .filter_map(|arg| existing_filename(arg.as_ref()))
        .collect()
}

fn existing_filename(arg: &str) -> Option<String> {
    if Path::new(arg).is_file() {
        return Some(arg.to_string());
    }
    let (_, filename) = arg.split_once('=')?;
    (!filename.is_empty() && Path::new(filename).is_file()).then(|| filename.to_string())
}

/// Fail on the first entry of `list` that does not exist.
///
/// # Errors
///
/// Returns [`SelectError::Missing`] naming the file.
pub fn ensure_files_exist<S: AsRef<str>>(list: &[S]) -> Result<(), SelectError> {
    match list.iter().find(|name| !Path::new(name.as_ref()).exists()) {
        Some(missing) => Err(SelectError::Missing(PathBuf::from(missing.as_ref()))),
        None => Ok(()),
    }
}

/// Split `list` by a regular expression.
///
/// An entry is excluded when the pattern matches its basename or the
/// full string.
///
/// # Arguments
///
/// * `list` - Candidate file names
/// * `pattern` - Regex, unanchored unless the pattern anchors itself
///
/// # Example
///
/// ```
/// use once_only::selector::filter_file_list;
///
/// let p = filter_file_list(&["run/a.log", "run/a.csv"], r"\.log$").unwrap();
/// assert_eq!(p.kept, vec!["run/a.csv"]);
/// assert_eq!(p.excluded, vec!["run/a.log"]);
/// ```
///
/// # Errors
///
/// Returns [`SelectError::InvalidRegex`] if the pattern does not compile.
pub fn filter_file_list<S: AsRef<str>>(list: &[S], pattern: &str) -> Result<Partition, SelectError> {
    let regex = Regex::new(pattern).map_err(|source| SelectError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(partition(list, |name| {
        let basename = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        regex.is_match(basename) || regex.is_match(name)
    }))
}

/// Split `list` by a glob pattern.
///
/// An entry is excluded when the glob's expansion on disk contains that
/// exact path. The glob is expanded once per call. Wildcards do not match
/// a leading `.`, so `*` leaves dotfiles alone.
///
/// # Errors
///
/// Returns [`SelectError::InvalidGlob`] if the pattern does not parse.
pub fn filter_file_list_by_glob<S: AsRef<str>>(
    list: &[S],
    glob_pattern: &str,
) -> Result<Partition, SelectError> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let matches: HashSet<PathBuf> = glob::glob_with(glob_pattern, options)
        .map_err(|source| SelectError::InvalidGlob {
            pattern: glob_pattern.to_string(),
            source,
        })?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("Skipping unreadable glob match: {}", e);
                None
            }
        })
        .collect();

    Ok(partition(list, |name| matches.contains(Path::new(name))))
}

/// Apply every filter in order; the excluded side is the union.
///
/// # Example
///
/// ```
/// use once_only::selector::{apply_filters, FileFilter};
///
/// let filters = [
///     FileFilter::Regex(r"\.log$".to_string()),
///     FileFilter::Regex(r"^tmp".to_string()),
/// ];
/// let p = apply_filters(&["a.log", "tmp1.csv", "b.csv"], &filters).unwrap();
/// assert_eq!(p.kept, vec!["b.csv"]);
/// ```
///
/// # Errors
///
/// Propagates the first invalid pattern.
pub fn apply_filters<S: AsRef<str>>(
    list: &[S],
    filters: &[FileFilter],
) -> Result<Partition, SelectError> {
    let mut result = Partition {
        kept: list.iter().map(|s| s.as_ref().to_string()).collect(),
        excluded: Vec::new(),
    };

    for filter in filters {
        let step = match filter {
            FileFilter::Regex(pattern) => filter_file_list(&result.kept, pattern)?,
            FileFilter::Glob(pattern) => filter_file_list_by_glob(&result.kept, pattern)?,
        };
        for name in &step.excluded {
            log::debug!("Skipping {} ({:?})", name, filter);
        }
        result.kept = step.kept;
        result.excluded.extend(step.excluded);
    }

    Ok(result)
}

fn partition<S: AsRef<str>>(list: &[S], is_excluded: impl Fn(&str) -> bool) -> Partition {
    let mut out = Partition::default();
    for name in list {
        let name = name.as_ref();
        if is_excluded(name) {
            out.excluded.push(name.to_string());
        } else {
            out.kept.push(name.to_string());
        }
    }
    out
}
