//! Reaching power-of-two multipliers with engines that only double.
//!
//! cain-ncnn-vulkan always outputs exactly twice the input frames, so larger
//! multipliers are produced by running it repeatedly, folder to folder
//! (1x -> 2x, then 2x -> 4x, ...). The intermediate folders are removed once
//! the last one is committed, so peak disk use grows with log2(multiplier)
//! frame sets.

use crate::engine::InterpolationEngine;
use crate::error::{CoreError, CoreResult};
use crate::progress_reporting;
use crate::frames::count_frames;
use crate::utils::{clear_dir, commit_folder, remove_dir_best_effort};
use std::path::{Path, PathBuf};

/// Checks that `multiplier` can be reached by repeated doubling.
pub fn validate_power_of_two(multiplier: u32) -> CoreResult<()> {
    if multiplier > 1 && multiplier.is_power_of_two() {
        Ok(())
    } else {
        Err(CoreError::InvalidMultiplier(multiplier))
    }
}

/// Names of the folders a chain to `multiplier` creates next to `final_output`.
pub fn intermediate_folders(
    engine: &dyn InterpolationEngine,
    final_output: &Path,
    multiplier: u32,
) -> Vec<PathBuf> {
    let parent = final_output.parent().unwrap_or_else(|| Path::new("."));
    let prefix = engine.kind().folder_prefix();
    let mut folders = Vec::new();
    let mut reached = 1u32;
    while reached < multiplier {
        reached *= 2;
        folders.push(parent.join(format!("{prefix}-{reached}x")));
    }
    folders
}

/// Interpolates `input` into `final_output` at `multiplier`, doubling each pass.
///
/// `final_output` is replaced, not merged. Intermediate folders other than
/// the last one are deleted afterwards unless `keep_intermediate` is set;
/// failing to delete one is only logged.
pub fn chain_multiplier(
    engine: &dyn InterpolationEngine,
    input: &Path,
    final_output: &Path,
    multiplier: u32,
    keep_intermediate: bool,
) -> CoreResult<()> {
    validate_power_of_two(multiplier)?;

    let folders = intermediate_folders(engine, final_output, multiplier);
    let mut from = input.to_path_buf();
    let mut reached = 1u32;

    for to in &folders {
        reached *= 2;
        let input_frames = count_frames(&from)?;
        log::info!("Interpolating to: {reached}x");
        log::info!("From: \"{}\"", from.display());
        log::info!("To: \"{}\"", to.display());
        clear_dir(to)?;

        progress_reporting::progress_started(
            &format!("{} {reached}x", engine.kind()),
            Some(input_frames * 2),
        );
        let result = engine.folder_mode(&from, to, None);
        progress_reporting::progress_finished();
        result?;

        from = to.clone();
    }

    commit_folder(&from, final_output)?;

    let leftovers = &folders[..folders.len().saturating_sub(1)];
    if keep_intermediate {
        if !leftovers.is_empty() {
            log::info!("Keeping intermediate folders: {leftovers:?}");
        }
    } else if !leftovers.is_empty() {
        log::info!("Deleting leftover folders: {leftovers:?}");
        for folder in leftovers {
            remove_dir_best_effort(folder);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineKind;

    struct NamingOnly(EngineKind);

    impl InterpolationEngine for NamingOnly {
        fn kind(&self) -> EngineKind {
            self.0
        }

        fn folder_mode(&self, _: &Path, _: &Path, _: Option<u64>) -> CoreResult<()> {
            unreachable!("naming tests never run the engine")
        }

        fn file_mode(&self, _: &Path, _: &Path, _: &Path, _: f64) -> CoreResult<()> {
            unreachable!("naming tests never run the engine")
        }
    }

    #[test]
    fn test_validate_power_of_two() {
        for ok in [2, 4, 8, 16, 1024] {
            assert!(validate_power_of_two(ok).is_ok(), "{ok}");
        }
        for bad in [0, 1, 3, 6, 12] {
            assert!(
                matches!(validate_power_of_two(bad), Err(CoreError::InvalidMultiplier(m)) if m == bad),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_intermediate_folder_names() {
        let engine = NamingOnly(EngineKind::CainNcnn);
        let folders = intermediate_folders(&engine, Path::new("/work/clip/interpolated_frames"), 8);
        assert_eq!(
            folders,
            vec![
                PathBuf::from("/work/clip/cain-2x"),
                PathBuf::from("/work/clip/cain-4x"),
                PathBuf::from("/work/clip/cain-8x"),
            ]
        );
    }
}
