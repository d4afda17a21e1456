// ============================================================================
// framesmith-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern dispatch to the console and a per-run log file
//
// The console gets `info` by default (`debug` with --verbose, `trace` with
// --debug). The log file always records at least `debug`, so engine output
// is available after a failed run.

use crate::error::CliResult;
use crate::progress;
use console::style;
use framesmith_core::CoreError;
use log::{Level, LevelFilter};
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// let log_filename = format!("framesmith_{}.log", framesmith_cli::logging::get_timestamp());
/// assert!(log_filename.ends_with(".log"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Console level for the `--verbose` / `--debug` flags.
pub fn console_level(verbose: bool, debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Trace
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// `<log_dir>/framesmith_<timestamp>.log`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("framesmith_{}.log", get_timestamp()))
}

fn styled_level(level: Level) -> String {
    match level {
        Level::Error => style("ERROR").red().bold().to_string(),
        Level::Warn => style("WARN ").yellow().bold().to_string(),
        Level::Info => style("INFO ").green().to_string(),
        Level::Debug => style("DEBUG").blue().to_string(),
        Level::Trace => style("TRACE").dim().to_string(),
    }
}

/// Installs the global logger. Call once, before any work starts.
pub fn init_logging(console: LevelFilter, log_file: Option<&Path>) -> CliResult<()> {
    let console_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{} {}", styled_level(record.level()), message))
        })
        .level(console)
        .chain(fern::Output::call(|record| {
            let line = record.args().to_string();
            progress::suspend(|| eprintln!("{line}"));
        }));

    let mut root = fern::Dispatch::new()
        .level(console.max(LevelFilter::Debug))
        .chain(console_dispatch);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {:<5} {}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(console.max(LevelFilter::Debug))
            .chain(fern::log_file(path)?);
        root = root.chain(file_dispatch);
    }

    root.apply()
        .map_err(|e| CoreError::Config(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level() {
        assert_eq!(console_level(false, false), LevelFilter::Info);
        assert_eq!(console_level(true, false), LevelFilter::Debug);
        assert_eq!(console_level(true, true), LevelFilter::Trace);
        assert_eq!(console_level(false, true), LevelFilter::Trace);
    }

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(Path::new("/videos/out/logs"));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("framesmith_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "framesmith_20240601_123045.log".len());
    }
}
