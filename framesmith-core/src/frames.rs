//! Frame folders.
//!
//! A frame folder holds one image per frame, named by a zero-padded integer
//! index (`00000001.png`). The folder contents are the source of truth for how
//! many frames a stage produced, so counts are always read from disk rather
//! than remembered.

use crate::error::{CoreError, CoreResult, fs_error};
use std::fs;
use std::path::{Path, PathBuf};

/// Width of the zero-padded frame index in file names.
pub const FRAME_INDEX_DIGITS: usize = 8;

/// Image extension used for extracted and interpolated frames.
pub const FRAME_EXTENSION: &str = "png";

/// printf-style pattern handed to ffmpeg for reading/writing frame sequences.
pub const FRAME_PATTERN: &str = "%08d.png";

const SYSTEM_ARTIFACTS: &[&str] = &["thumbs.db", "desktop.ini"];

/// A frame file and the index parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub path: PathBuf,
}

fn is_frame_entry(entry: &fs::DirEntry) -> bool {
    let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
    if !is_file {
        return false;
    }
    let name = entry.file_name();
    let name = name.to_string_lossy();
    !name.starts_with('.') && !SYSTEM_ARTIFACTS.contains(&name.to_ascii_lowercase().as_str())
}

fn frame_entries(folder: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|e| fs_error("reading", folder, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| fs_error("reading", folder, e))?;
        if is_frame_entry(&entry) {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}

/// Counts the frame files in `folder`.
///
/// Only regular files count; subdirectories, dot-files and OS thumbnail
/// artifacts are skipped. A missing folder counts as zero frames.
pub fn count_frames(folder: &Path) -> CoreResult<u64> {
    if !folder.is_dir() {
        log::debug!("Frame folder {} does not exist", folder.display());
        return Ok(0);
    }
    Ok(frame_entries(folder)?.len() as u64)
}

/// Parses the numeric index from a frame file name (`00000042.png` -> 42).
pub fn frame_index(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

/// Formats the file name for frame `index`.
pub fn frame_file_name(index: u64, extension: &str) -> String {
    format!("{index:0width$}.{extension}", width = FRAME_INDEX_DIGITS)
}

/// Lists the frames in `folder` sorted by index.
///
/// Fails when a file name does not carry an index, since gap-aware
/// interpolation depends on the indices being meaningful.
pub fn list_frames(folder: &Path) -> CoreResult<Vec<Frame>> {
    let mut frames = frame_entries(folder)?
        .into_iter()
        .map(|path| match frame_index(&path) {
            Some(index) => Ok(Frame { index, path }),
            None => Err(CoreError::Config(format!(
                "Frame file '{}' is not named by a frame number",
                path.display()
            ))),
        })
        .collect::<CoreResult<Vec<_>>>()?;
    frames.sort_by_key(|f| f.index);
    Ok(frames)
}
