//! Utility functions for formatting, frame rates and folder handling.

use crate::error::{CoreError, CoreResult, fs_error};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Formats a duration as HH:MM:SS (e.g., 3725s -> "01:02:05").
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Parses a frame rate given as a fraction (`"30000/1001"`) or a plain number (`"25"`).
///
/// A zero denominator, non-numeric parts or a non-positive result are
/// configuration errors.
pub fn parse_frame_rate(rate: &str) -> CoreResult<f64> {
    let invalid = || CoreError::InvalidFrameRate(rate.to_string());
    let trimmed = rate.trim();

    let fps = match trimmed.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| invalid())?;
            let den: f64 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0.0 {
                return Err(invalid());
            }
            num / den
        }
        None => trimmed.parse().map_err(|_| invalid())?,
    };

    if fps.is_finite() && fps > 0.0 {
        Ok(fps)
    } else {
        Err(invalid())
    }
}

/// Moves `from` into place at `to`, replacing whatever was there.
///
/// An existing `to` is deleted first (no merging of frame sets). A missing
/// `from` is an error even when `to` exists, so a stage that produced nothing
/// never passes off an older result as its own. `from == to` is a no-op.
pub fn commit_folder(from: &Path, to: &Path) -> CoreResult<()> {
    if from == to {
        return Ok(());
    }
    if !from.is_dir() {
        return Err(fs_error(
            "committing",
            from,
            std::io::Error::new(std::io::ErrorKind::NotFound, "folder was not produced"),
        ));
    }
    if to.exists() {
        log::info!("\"{}\" already exists, deleting", to.display());
        fs::remove_dir_all(to).map_err(|e| fs_error("deleting", to, e))?;
    }
    log::info!("Renaming \"{}\" to \"{}\"", from.display(), to.display());
    fs::rename(from, to).map_err(|e| fs_error("renaming", from, e))
}

/// Deletes `path` if it exists so a stage starts from an empty folder.
pub fn clear_dir(path: &Path) -> CoreResult<()> {
    if path.exists() {
        log::info!("Removing stale folder \"{}\"", path.display());
        fs::remove_dir_all(path).map_err(|e| fs_error("deleting", path, e))?;
    }
    Ok(())
}

/// Deletes a folder, logging instead of failing when that is not possible.
pub fn remove_dir_best_effort(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => {
            log::debug!("Deleted {}", path.display());
            true
        }
        Err(e) => {
            log::warn!("Could not delete leftover folder {}: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_duration(Duration::from_secs(90061)), "25:01:01");
        assert_eq!(format_duration(Duration::from_millis(59_900)), "00:00:59");
    }

    #[test]
    fn test_parse_frame_rate() {
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.970_029_97).abs() < 1e-6);
        assert!((ntsc * 2.0 - 59.940_059_94).abs() < 1e-6);
        assert_eq!(parse_frame_rate("25/1").unwrap(), 25.0);
        assert_eq!(parse_frame_rate("24").unwrap(), 24.0);
        assert_eq!(parse_frame_rate(" 23.976 ").unwrap(), 23.976);
    }

    #[test]
    fn test_parse_frame_rate_rejects_bad_input() {
        for bad in ["0/0", "30/0", "abc", "", "0", "-30/1", "1/2/3"] {
            assert!(
                matches!(parse_frame_rate(bad), Err(CoreError::InvalidFrameRate(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_commit_folder_replaces_destination() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let from = dir.path().join("cain-4x");
        let to = dir.path().join("interpolated_frames");
        fs::create_dir(&from)?;
        File::create(from.join("00000001.png"))?;
        fs::create_dir(&to)?;
        File::create(to.join("stale.png"))?;

        commit_folder(&from, &to)?;

        assert!(!from.exists());
        assert!(to.join("00000001.png").exists());
        assert!(!to.join("stale.png").exists());

        Ok(())
    }

    #[test]
    fn test_commit_folder_missing_source_fails() {
        let dir = tempdir().unwrap();
        let result = commit_folder(&dir.path().join("nope"), &dir.path().join("also-nope"));
        assert!(matches!(result, Err(CoreError::Filesystem { .. })));
    }

    #[test]
    fn test_commit_folder_missing_source_keeps_stale_destination() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let to = dir.path().join("interpolated_frames");
        fs::create_dir(&to)?;
        File::create(to.join("stale.png"))?;

        let result = commit_folder(&dir.path().join("dynamic-2x"), &to);

        assert!(matches!(result, Err(CoreError::Filesystem { .. })));
        assert!(to.join("stale.png").exists());
        Ok(())
    }

    #[test]
    fn test_commit_folder_same_path_is_noop() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let folder = dir.path().join("interpolated_frames");
        fs::create_dir(&folder)?;
        commit_folder(&folder, &folder)?;
        assert!(folder.is_dir());
        Ok(())
    }

    #[test]
    fn test_clear_dir() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let target = dir.path().join("dynamic-2x");
        fs::create_dir(&target)?;
        File::create(target.join("00000001.png"))?;
        clear_dir(&target)?;
        assert!(!target.exists());
        clear_dir(&target)?;
        Ok(())
    }

    #[test]
    fn test_remove_dir_best_effort() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("cain-2x");
        fs::create_dir(&target).unwrap();
        assert!(remove_dir_best_effort(&target));
        assert!(!target.exists());
        assert!(remove_dir_best_effort(&target));
    }
}
