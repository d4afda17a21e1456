//! Implementation of the 'interpolate' subcommand.
//!
//! Turns the arguments into a validated `CoreConfig`, checks that the tools
//! needed by the selected stages can be started, and runs the pipeline with
//! the real ffmpeg, ffprobe and ncnn-vulkan collaborators.

use crate::cli::InterpolateArgs;
use crate::error::CliResult;

use framesmith_core::config::{CoreConfig, CoreConfigBuilder};
use framesmith_core::engine::NcnnEngine;
use framesmith_core::external::{
    CrateFfprobeExecutor, FfmpegEncoder, FfmpegExtractor, check_dependency, check_program,
};
use framesmith_core::pipeline::{Collaborators, PipelineReport, Stage, run_pipeline};
use framesmith_core::format_duration;

use console::style;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

/// Builds and validates the core configuration from the command line.
pub fn build_config(args: &InterpolateArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new()
        .input_file(&args.input_file)
        .output_root(&args.output_dir)
        .engine(args.engine)
        .mode(args.mode)
        .multiplier(args.multiplier)
        .loop_video(args.loop_video)
        .video_type(&args.video_type)
        .steps(args.steps)
        .keep_intermediate(args.keep_intermediate);

    if let Some(path) = &args.engine_path {
        builder = builder.engine_path(path);
    }
    if let Some(fps) = args.input_fps {
        builder = builder.input_fps(fps);
    }
    if let Some(tile_size) = &args.tile_size {
        builder = builder.tile_size(tile_size);
    }
    if let Some(gpu_id) = &args.gpu_id {
        builder = builder.gpu_id(gpu_id);
    }
    if let Some(threads) = &args.threads {
        builder = builder.threads(threads);
    }
    if let Some(seconds) = args.timeout {
        builder = builder.engine_timeout(Duration::from_secs(seconds));
    }

    builder.build()
}

/// Programs the selected stages will launch.
pub fn required_programs(config: &CoreConfig, ffmpeg_path: Option<&PathBuf>) -> Vec<PathBuf> {
    let ffmpeg = ffmpeg_path.cloned().unwrap_or_else(|| PathBuf::from("ffmpeg"));
    let mut programs = Vec::new();
    if config.steps.contains(Stage::Extract) || config.steps.contains(Stage::Encode) {
        programs.push(ffmpeg);
    }
    if config.steps.contains(Stage::Encode) && config.input_fps.is_none() {
        programs.push(PathBuf::from("ffprobe"));
    }
    if config.steps.contains(Stage::Interpolate) {
        programs.push(config.engine_binary());
    }
    programs
}

fn check_dependencies(config: &CoreConfig, ffmpeg_path: Option<&PathBuf>) -> CliResult<()> {
    let engine = config.engine_binary();
    for program in required_programs(config, ffmpeg_path) {
        if program == engine {
            // ncnn-vulkan binaries print their usage for -h.
            check_program(&program, &["-h"])?;
        } else {
            check_dependency(&program)?;
        }
    }
    Ok(())
}

/// Runs the pipeline and prints its summary.
pub fn run_interpolate(args: &InterpolateArgs) -> CliResult<PipelineReport> {
    let config = build_config(args)?;
    info!("Input video: {}", config.input_file.display());
    info!("Working directory: {}", config.working_dir()?.display());
    debug!("Configuration: {config:?}");

    check_dependencies(&config, args.ffmpeg_path.as_ref())?;

    let engine = NcnnEngine::new(
        config.engine,
        config.engine_binary(),
        config.engine_settings.clone(),
    );
    let extractor = FfmpegExtractor::new(args.ffmpeg_path.clone());
    let encoder = FfmpegEncoder::new(args.ffmpeg_path.clone());
    let probe = CrateFfprobeExecutor::new();

    let report = run_pipeline(
        &config,
        &Collaborators {
            engine: &engine,
            extractor: &extractor,
            encoder: &encoder,
            probe: &probe,
        },
    )?;

    print_summary(&report);
    Ok(report)
}

/// Summary lines for a finished run.
pub fn summary_lines(report: &PipelineReport) -> Vec<(&'static str, String)> {
    let mut lines = vec![("Working directory", report.working_dir.display().to_string())];
    let stages: Vec<&str> = report.stages_run.iter().map(|s| s.name()).collect();
    lines.push(("Stages", stages.join(", ")));
    if let Some(count) = report.extracted_frames {
        lines.push(("Extracted frames", count.to_string()));
    }
    if let Some(count) = report.interpolated_frames {
        lines.push(("Interpolated frames", count.to_string()));
    }
    if let Some(video) = &report.output_video {
        lines.push(("Output video", video.display().to_string()));
    }
    if let Some(fps) = report.output_fps {
        lines.push(("Output frame rate", format!("{fps:.3} fps")));
    }
    lines.push(("Total time", format_duration(report.elapsed)));
    lines
}

fn print_summary(report: &PipelineReport) {
    let lines = summary_lines(report);
    let width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    crate::progress::suspend(|| {
        println!("\n{}", style("Summary").bold().bright());
        for (label, value) in &lines {
            println!("  {}  {value}", style(format!("{label:<width$}")).bold());
        }
    });
}
