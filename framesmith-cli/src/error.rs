// ============================================================================
// framesmith-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: result alias and the final error report
//
// The CLI reuses CoreError so that the stage and category of a failure reach
// the user unchanged.

use console::style;
use framesmith_core::{CoreError, CoreResult};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Lines printed under the error message: stage, category and engine failure kind.
pub fn error_details(err: &CoreError) -> Vec<(&'static str, String)> {
    let mut details = Vec::new();
    if let Some(stage) = err.stage() {
        details.push(("Stage", format!("{} ({})", stage, stage.number())));
    }
    details.push(("Kind", err.category().to_string()));
    if let Some(kind) = err.engine_error_kind() {
        details.push(("Engine failure", kind.to_string()));
    }
    details
}

/// Prints a failed run to stderr.
pub fn print_error(err: &CoreError) {
    eprintln!("{} {}", style("Error:").red().bold(), err);
    for (label, value) in error_details(err) {
        eprintln!("  {}: {}", style(label).bold(), value);
    }
}
