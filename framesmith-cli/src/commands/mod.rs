//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// The `interpolate` command: runs the frame interpolation pipeline.
pub mod interpolate;

/// The `probe` command: reports frame rates and working directory state.
pub mod probe;
