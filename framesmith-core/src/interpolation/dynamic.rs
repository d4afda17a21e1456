//! Gap-aware interpolation for variable-rate footage.
//!
//! Frames are read by their original index, so frames that were dropped from
//! the source (1, 3, 7, ...) are re-synthesized at the right temporal
//! position: a gap of `g` between two kept frames gets `g - 1` new frames at
//! time-steps `n / g`. With a multiplier `m` every original position is
//! stretched to `(index - 1) * m + 1` and gaps grow to `g * m`.

use crate::engine::InterpolationEngine;
use crate::error::{CoreError, CoreResult, fs_error};
use crate::frames::{Frame, frame_file_name, list_frames};
use crate::progress_reporting;
use std::fs;
use std::path::{Path, PathBuf};

/// One unit of work in a dynamic interpolation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicStep {
    /// Copy an existing frame unchanged to output position `index`.
    Copy { source: PathBuf, index: u64 },
    /// Synthesize output position `index` between two source frames.
    Interpolate {
        frame0: PathBuf,
        frame1: PathBuf,
        index: u64,
        time_step: f64,
    },
}

impl DynamicStep {
    /// Output position this step writes.
    pub fn index(&self) -> u64 {
        match self {
            Self::Copy { index, .. } | Self::Interpolate { index, .. } => *index,
        }
    }
}

fn index_overflow(index: u64, multiplier: u64) -> CoreError {
    CoreError::Config(format!(
        "Frame index {index} at {multiplier}x is out of range for dynamic interpolation"
    ))
}

fn scaled_position(index: u64, multiplier: u64) -> CoreResult<u64> {
    (index - 1)
        .checked_mul(multiplier)
        .and_then(|p| p.checked_add(1))
        .ok_or_else(|| index_overflow(index, multiplier))
}

fn push_gap(steps: &mut Vec<DynamicStep>, from: &Frame, to: &Frame, start: u64, gap: u64) {
    steps.push(DynamicStep::Copy {
        source: from.path.clone(),
        index: start,
    });
    for n in 1..gap {
        steps.push(DynamicStep::Interpolate {
            frame0: from.path.clone(),
            frame1: to.path.clone(),
            index: start + n,
            time_step: n as f64 / gap as f64,
        });
    }
}

/// Computes the steps of a dynamic pass without touching the engine.
///
/// `frames` must be sorted by index (as returned by [`list_frames`]).
/// `original_frame_count` is the frame count of the source before any frames
/// were dropped; it decides how far past the last kept frame the output runs.
pub fn plan_dynamic(
    frames: &[Frame],
    original_frame_count: u64,
    multiplier: u32,
    loop_video: bool,
) -> CoreResult<Vec<DynamicStep>> {
    if multiplier == 0 {
        return Err(CoreError::InvalidMultiplier(multiplier));
    }
    let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
        return Err(CoreError::Config(
            "Dynamic interpolation needs at least one frame".to_string(),
        ));
    };
    if first.index == 0 {
        return Err(CoreError::Config(format!(
            "Frame '{}' has index 0; frame numbering starts at 1",
            first.path.display()
        )));
    }

    let m = u64::from(multiplier);
    let tail_gap = original_frame_count
        .checked_add(1)
        .ok_or_else(|| index_overflow(original_frame_count, m))?
        .checked_sub(last.index)
        .filter(|gap| *gap >= 1)
        .ok_or_else(|| {
            CoreError::Config(format!(
                "Original frame count {original_frame_count} is lower than the last frame index {}",
                last.index
            ))
        })?;

    let mut steps = Vec::new();
    for pair in frames.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let gap = (to.index - from.index)
            .checked_mul(m)
            .ok_or_else(|| index_overflow(to.index, m))?;
        push_gap(&mut steps, from, to, scaled_position(from.index, m)?, gap);
    }

    let tail_start = scaled_position(last.index, m)?;
    let tail_gap = tail_gap
        .checked_mul(m)
        .filter(|gap| tail_start.checked_add(*gap).is_some())
        .ok_or_else(|| index_overflow(original_frame_count, m))?;
    if loop_video {
        push_gap(&mut steps, last, first, tail_start, tail_gap);
    } else {
        for n in 0..tail_gap {
            steps.push(DynamicStep::Copy {
                source: last.path.clone(),
                index: tail_start + n,
            });
        }
    }

    Ok(steps)
}

/// Runs a dynamic pass from `input` into `output` at the source frame rate.
pub fn interpolate_dynamic(
    engine: &dyn InterpolationEngine,
    input: &Path,
    output: &Path,
    original_frame_count: u64,
    loop_video: bool,
) -> CoreResult<u64> {
    interpolate_dynamic_scaled(engine, input, output, original_frame_count, 1, loop_video)
}

/// Runs a dynamic pass that also multiplies the frame rate by `multiplier`.
///
/// Returns the number of frames written. A failing engine call aborts the
/// pass and leaves the frames written so far in `output`.
pub fn interpolate_dynamic_scaled(
    engine: &dyn InterpolationEngine,
    input: &Path,
    output: &Path,
    original_frame_count: u64,
    multiplier: u32,
    loop_video: bool,
) -> CoreResult<u64> {
    let kind = engine.kind();
    if !kind.supports_time_step() {
        return Err(CoreError::Config(format!(
            "{kind} cannot interpolate at arbitrary time-steps; dynamic mode needs dain-ncnn or rife-ncnn"
        )));
    }

    let frames = list_frames(input)?;
    if frames.is_empty() {
        return Err(CoreError::NoFrames(input.to_path_buf()));
    }
    let steps = plan_dynamic(&frames, original_frame_count, multiplier, loop_video)?;

    fs::create_dir_all(output).map_err(|e| fs_error("creating", output, e))?;
    log::info!(
        "Dynamic interpolation: {} source frames -> {} output frames ({multiplier}x, loop: {loop_video})",
        frames.len(),
        steps.len()
    );

    progress_reporting::progress_started(&format!("{kind} dynamic"), Some(steps.len() as u64));
    let result = run_steps(engine, &steps, output);
    progress_reporting::progress_finished();
    result?;

    Ok(steps.len() as u64)
}

fn run_steps(engine: &dyn InterpolationEngine, steps: &[DynamicStep], output: &Path) -> CoreResult<()> {
    for (done, step) in steps.iter().enumerate() {
        match step {
            DynamicStep::Copy { source, index } => {
                let extension = source.extension().and_then(|e| e.to_str()).unwrap_or("png");
                let target = output.join(frame_file_name(*index, extension));
                fs::copy(source, &target).map_err(|e| fs_error("copying", source, e))?;
            }
            DynamicStep::Interpolate {
                frame0,
                frame1,
                index,
                time_step,
            } => {
                let extension = frame0.extension().and_then(|e| e.to_str()).unwrap_or("png");
                let target = output.join(frame_file_name(*index, extension));
                log::debug!(
                    "Frame {index}: {} -> {} at {time_step:.4}",
                    frame0.display(),
                    frame1.display()
                );
                engine.file_mode(frame0, frame1, &target, *time_step)?;
            }
        }
        progress_reporting::progress_position(done as u64 + 1);
    }
    Ok(())
}
