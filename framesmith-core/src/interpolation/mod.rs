//! Interpolation strategies built on top of an [`InterpolationEngine`].
//!
//! - [`interpolate_static`]: uniform multiplication of a contiguous frame set,
//!   either in a single engine run or by [chaining](chain::chain_multiplier)
//!   doubling runs.
//! - [`dynamic::interpolate_dynamic_scaled`]: gap-aware interpolation for
//!   frame sets with missing indices.

pub mod chain;
pub mod dynamic;

pub use chain::{chain_multiplier, validate_power_of_two};
pub use dynamic::{DynamicStep, interpolate_dynamic, interpolate_dynamic_scaled, plan_dynamic};

use crate::engine::InterpolationEngine;
use crate::error::{CoreError, CoreResult};
use crate::frames::count_frames;
use crate::progress_reporting;
use crate::utils::{clear_dir, commit_folder};
use std::path::{Path, PathBuf};

/// Staging folder a single-run static pass writes to before it is committed.
pub fn staging_folder(engine: &dyn InterpolationEngine, final_output: &Path, multiplier: u32) -> PathBuf {
    let parent = final_output.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}-{multiplier}x", engine.kind().folder_prefix()))
}

/// Multiplies the frame count of `input` by `multiplier` into `final_output`.
///
/// Returns the number of frames in `final_output` afterwards.
pub fn interpolate_static(
    engine: &dyn InterpolationEngine,
    input: &Path,
    final_output: &Path,
    multiplier: u32,
    keep_intermediate: bool,
) -> CoreResult<u64> {
    let frames = count_frames(input)?;
    if frames == 0 {
        return Err(CoreError::NoFrames(input.to_path_buf()));
    }

    if engine.kind().supports_target_count() {
        if multiplier < 2 {
            return Err(CoreError::InvalidMultiplier(multiplier));
        }
        let target = frames * u64::from(multiplier);
        let staging = staging_folder(engine, final_output, multiplier);
        clear_dir(&staging)?;
        log::info!(
            "Interpolating {frames} frames to {target} ({multiplier}x) with {}",
            engine.kind()
        );

        progress_reporting::progress_started(&format!("{} {multiplier}x", engine.kind()), Some(target));
        let result = engine.folder_mode(input, &staging, Some(target));
        progress_reporting::progress_finished();
        result?;

        commit_folder(&staging, final_output)?;
    } else {
        chain_multiplier(engine, input, final_output, multiplier, keep_intermediate)?;
    }

    count_frames(final_output)
}
