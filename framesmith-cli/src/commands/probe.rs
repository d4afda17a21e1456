//! Implementation of the 'probe' subcommand.
//!
//! Prints the real and average frame rates of a video, and what a previous
//! run left in its working directory when an output folder is given.

use crate::cli::ProbeArgs;
use crate::error::CliResult;

use framesmith_core::external::{CrateFfprobeExecutor, MetadataProbe, StreamRates};
use framesmith_core::{CoreError, PipelineState, WorkingDirectory, count_frames};

use console::style;
use std::path::Path;

/// Frame rate lines for the probed stream.
pub fn rate_lines(rates: &StreamRates) -> CliResult<Vec<(&'static str, String)>> {
    let real = rates.real()?;
    let average = rates.average()?;
    let variable = if rates.is_variable()? { "yes" } else { "no" };
    Ok(vec![
        ("Real frame rate", format!("{} ({real:.3} fps)", rates.real_fps)),
        ("Average frame rate", format!("{} ({average:.3} fps)", rates.average_fps)),
        ("Variable frame rate", variable.to_string()),
    ])
}

/// Lines describing an existing working directory, empty if there is none.
pub fn working_dir_lines(dir: &WorkingDirectory) -> CliResult<Vec<(&'static str, String)>> {
    if !dir.root().is_dir() {
        return Ok(Vec::new());
    }
    let mut lines = vec![("Working directory", dir.root().display().to_string())];
    for (label, folder) in [
        ("Original frames", dir.original_frames()),
        ("Interpolated frames", dir.interpolated_frames()),
    ] {
        if folder.is_dir() {
            lines.push((label, count_frames(&folder)?.to_string()));
        }
    }

    let state = PipelineState::load(dir.root())?;
    if let Some(suffix) = state.output_suffix {
        lines.push(("Output suffix", suffix));
    }
    if let Some(updated) = state.updated_at {
        lines.push(("Last updated", updated.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    }
    if dir.lock_file().exists() {
        lines.push(("Locked", "yes (a run is active or was interrupted)".to_string()));
    }
    Ok(lines)
}

fn print_block(title: &str, lines: &[(&str, String)]) {
    let width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    println!("{}", style(title).bold().bright());
    for (label, value) in lines {
        println!("  {}  {value}", style(format!("{label:<width$}")).bold());
    }
}

pub fn run_probe(args: &ProbeArgs) -> CliResult<()> {
    if !args.input_file.is_file() {
        return Err(CoreError::Config(format!(
            "Input video '{}' does not exist",
            args.input_file.display()
        )));
    }

    let rates = CrateFfprobeExecutor::new().probe(&args.input_file)?;
    print_block(&args.input_file.display().to_string(), &rate_lines(&rates)?);

    if let Some(output_dir) = &args.output_dir {
        let dir = working_dir_for(&args.input_file, output_dir);
        let lines = working_dir_lines(&dir)?;
        if lines.is_empty() {
            println!("No working directory at {}", dir.root().display());
        } else {
            print_block("Working directory", &lines);
        }
    }
    Ok(())
}

fn working_dir_for(input: &Path, output_dir: &Path) -> WorkingDirectory {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    WorkingDirectory::new(output_dir.join(stem))
}
