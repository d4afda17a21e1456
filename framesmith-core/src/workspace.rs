//! Working directory layout and the single-run lock.
//!
//! A run against `clip.mp4` with output root `out/` owns `out/clip/`:
//!
//! ```text
//! out/clip/
//!   original_frames/       extracted source frames
//!   interpolated_frames/   committed interpolation result
//!   output_videos/         encoded videos
//!   pipeline_state.json
//!   .framesmith.lock       present while a run is active
//! ```
//!
//! Engine staging folders (`cain-2x`, `dynamic-4x`, ...) are created next to
//! these while the interpolate stage runs.

use crate::error::{CoreError, CoreResult, fs_error};
use crate::state::STATE_FILE_NAME;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const ORIGINAL_FRAMES_DIR: &str = "original_frames";
pub const INTERPOLATED_FRAMES_DIR: &str = "interpolated_frames";
pub const OUTPUT_VIDEOS_DIR: &str = "output_videos";
pub const LOCK_FILE_NAME: &str = ".framesmith.lock";

/// Paths inside a per-input working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    root: PathBuf,
}

impl WorkingDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root folder if needed.
    pub fn create(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let dir = Self::new(root);
        fs::create_dir_all(&dir.root).map_err(|e| fs_error("creating", &dir.root, e))?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn original_frames(&self) -> PathBuf {
        self.root.join(ORIGINAL_FRAMES_DIR)
    }

    pub fn interpolated_frames(&self) -> PathBuf {
        self.root.join(INTERPOLATED_FRAMES_DIR)
    }

    pub fn output_videos(&self) -> PathBuf {
        self.root.join(OUTPUT_VIDEOS_DIR)
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Staging folder for a dynamic pass at `multiplier`.
    pub fn dynamic_staging(&self, multiplier: u32) -> PathBuf {
        self.root.join(format!("dynamic-{multiplier}x"))
    }
}

/// Guard for exclusive use of a working directory. The lock file is removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock for `dir`, failing if another run holds it.
    ///
    /// A lock left behind by a crashed run has to be removed by hand; the
    /// error message names the file.
    pub fn acquire(dir: &WorkingDirectory) -> CoreResult<Self> {
        let path = dir.lock_file();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(CoreError::Config(format!(
                    "Working directory {} is in use by another run (pid {}); delete {} if that run is gone",
                    dir.root().display(),
                    holder.trim(),
                    path.display()
                )));
            }
            Err(e) => return Err(fs_error("creating", &path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| fs_error("writing", &path, e))?;
        log::debug!("Acquired run lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Could not remove run lock {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout() {
        let dir = WorkingDirectory::new("/out/clip");
        assert_eq!(dir.original_frames(), PathBuf::from("/out/clip/original_frames"));
        assert_eq!(dir.interpolated_frames(), PathBuf::from("/out/clip/interpolated_frames"));
        assert_eq!(dir.output_videos(), PathBuf::from("/out/clip/output_videos"));
        assert_eq!(dir.state_file(), PathBuf::from("/out/clip/pipeline_state.json"));
        assert_eq!(dir.dynamic_staging(2), PathBuf::from("/out/clip/dynamic-2x"));
    }

    #[test]
    fn test_lock_is_exclusive_and_released() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        let dir = WorkingDirectory::create(tmp.path().join("clip"))?;

        let lock = RunLock::acquire(&dir)?;
        let contents = fs::read_to_string(lock.path())?;
        assert_eq!(contents.trim(), std::process::id().to_string());

        let second = RunLock::acquire(&dir);
        assert!(matches!(second, Err(CoreError::Config(_))));

        drop(lock);
        assert!(!dir.lock_file().exists());
        let _again = RunLock::acquire(&dir)?;
        Ok(())
    }
}
