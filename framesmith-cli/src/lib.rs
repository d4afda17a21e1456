// framesmith-cli/src/lib.rs
//
// Library portion of the Framesmith CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, InterpolateArgs, ProbeArgs};
pub use commands::interpolate::run_interpolate;
pub use commands::probe::run_probe;
