// ============================================================================
// framesmith-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: terminal rendering of core progress events
//
// The core reports stages, frame progress and messages through its global
// ProgressReporter. This module draws them with indicatif progress bars and
// console styling. Console log lines go through `suspend` so they never tear
// an active bar.

use console::style;
use framesmith_core::pipeline::Stage;
use framesmith_core::progress_reporting::{self, MessageLevel, ProgressReporter};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed_precise}] {pos} frames";

static BARS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

/// Runs `f` with any active progress bar hidden.
pub fn suspend<F: FnOnce() -> R, R>(f: F) -> R {
    BARS.suspend(f)
}

fn create_bar(label: &str, total: Option<u64>) -> ProgressBar {
    let bar = match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░ "),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar
        }
    };
    bar.set_message(label.to_string());
    let bar = BARS.add(bar);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// [`ProgressReporter`] drawing to the terminal.
#[derive(Default)]
pub struct CliProgressReporter {
    current: Mutex<Option<ProgressBar>>,
}

impl CliProgressReporter {
    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(current) = self.current.lock() {
            if let Some(bar) = current.as_ref() {
                f(bar);
            }
        }
    }
}

/// Register the CLI progress reporter with the core library
pub fn register_cli_reporter() {
    progress_reporting::set_progress_reporter(Box::new(CliProgressReporter::default()));
}

impl ProgressReporter for CliProgressReporter {
    fn stage_started(&self, stage: Stage, detail: &str) {
        let heading = format!("[{}/{}] {}", stage.number(), Stage::ALL.len(), stage.name());
        suspend(|| {
            eprintln!("\n{} {}", style(heading).bold().cyan(), style(detail).dim());
        });
    }

    fn progress_started(&self, label: &str, total: Option<u64>) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.take() {
                previous.finish_and_clear();
            }
            *current = Some(create_bar(label, total));
        }
    }

    fn progress_tick(&self) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn progress_position(&self, position: u64) {
        self.with_bar(|bar| bar.set_position(position));
    }

    fn progress_finished(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(bar) = current.take() {
                bar.finish();
            }
        }
    }

    fn message(&self, level: MessageLevel, text: &str) {
        let line = match level {
            MessageLevel::Info => format!("{} {}", style("•").bright(), text),
            MessageLevel::Success => format!("{} {}", style("✓").green().bold(), style(text).green()),
            MessageLevel::Warning => format!("{} {}", style("!").yellow().bold(), style(text).yellow()),
            MessageLevel::Error => format!("{} {}", style("✗").red().bold(), style(text).red()),
        };
        suspend(|| eprintln!("{line}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lifecycle_without_terminal() {
        let reporter = CliProgressReporter::default();
        reporter.progress_tick();
        reporter.progress_started("dain-ncnn 2x", Some(10));
        reporter.progress_tick();
        reporter.progress_position(5);
        reporter.with_bar(|bar| assert_eq!(bar.position(), 5));
        reporter.progress_finished();
        assert!(reporter.current.lock().unwrap().is_none());
    }

    #[test]
    fn test_new_bar_replaces_unfinished_one() {
        let reporter = CliProgressReporter::default();
        reporter.progress_started("ffmpeg (extract)", None);
        reporter.progress_started("cain-ncnn 2x", Some(4));
        reporter.with_bar(|bar| assert_eq!(bar.length(), Some(4)));
        reporter.progress_finished();
    }
}
