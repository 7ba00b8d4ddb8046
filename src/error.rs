//! Exit codes and structured error reporting.

use clap::error::ErrorKind;
use serde::Serialize;

/// Exit codes for `once-only-check`.
///
/// - 0: Success (outputs valid, cache hit, or the requested action completed)
/// - 1: General error (fatal, e.g. a declared input is missing)
/// - 2: Stale (cache miss, or an output diverged from its manifest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the action completed, or the cached run is still valid.
    Success = 0,
    /// General error: a fatal error aborted the invocation.
    GeneralError = 1,
    /// Stale: no reusable manifest, the command must run again.
    Stale = 2,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "OO000",
            Self::GeneralError => "OO001",
            Self::Stale => "OO002",
        }
    }

    /// Exit code for a command line that failed to parse.
    ///
    /// `--help` and `--version` succeed. Every other parse failure is a
    /// fatal usage error and must never look like a cache miss.
    #[must_use]
    pub fn from_clap_error(err: &clap::Error) -> Self {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Self::Success,
            _ => Self::GeneralError,
        }
    }
}

/// First line of a clap error without its `error: ` tag, for the
/// single-line `ERROR:` diagnostic.
#[must_use]
pub fn usage_error_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "OO001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, causes included
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
