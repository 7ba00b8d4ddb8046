//! Logging setup for `once-only-check`.
//!
//! Uses the `log` facade with an `env_logger` backend writing to stderr.
//! Stderr is shared with whatever command the wrapper runs, so every line
//! carries a `once-only:` prefix.
//!
//! Level priority:
//!
//! 1. `ONCE_ONLY_LOG` environment filter, then `RUST_LOG`
//! 2. `--quiet` (errors only)
//! 3. `-v` (debug) / `-vv` (trace)
//! 4. Default: info

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Environment variable holding an `env_logger` filter string.
pub const LOG_ENV: &str = "ONCE_ONLY_LOG";

/// Initialize logging from the CLI verbosity flags.
///
/// Call once at startup, before the first log statement. Later calls are
/// ignored, so tests may call it freely.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace with
///   module paths)
/// * `quiet` - If true, only show errors (overridden by `ONCE_ONLY_LOG`
///   and `RUST_LOG`)
///
/// # Example
///
/// ```rust,no_run
/// use once_only::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("Selected 3 files");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    let env_filter = env::var(LOG_ENV).or_else(|_| env::var("RUST_LOG")).ok();
    match &env_filter {
        Some(filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
        }
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose >= 2 {
            writeln!(
                buf,
                "once-only: {style}{:<5}{style:#} [{}] {}",
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "once-only: {style}{:<5}{style:#} {}", level, record.args())
        }
    });

    if builder.try_init().is_ok() {
        log::debug!(
            "Logging initialized ({})",
            env_filter.as_deref().unwrap_or("from CLI flags")
        );
    }
}

/// Map the CLI flags to a level. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
