//! State carried between pipeline stages and across runs.
//!
//! Each working directory keeps a small JSON file so a later run that skips
//! some stages still knows what earlier stages produced. The file is loaded
//! once at the start of a run and saved after every stage.

use crate::error::{CoreError, CoreResult, fs_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// File name of the state file inside a working directory.
pub const STATE_FILE_NAME: &str = "pipeline_state.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    /// Frames written by the last extract.
    pub extracted_frame_count: Option<u64>,
    /// Suffix of the output file name, e.g. `-rife-ncnn-2x-dynamic`.
    pub output_suffix: Option<String>,
    /// Frames in the committed interpolated folder.
    pub interpolated_frame_count: Option<u64>,
    /// Source frame rate the encode multiplies.
    pub source_fps: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Loads the state file from `working_dir`.
    ///
    /// A missing file is an empty state. So is a malformed one, with a warning:
    /// losing the record only means counts are re-derived from disk.
    pub fn load(working_dir: &Path) -> CoreResult<Self> {
        let path = working_dir.join(STATE_FILE_NAME);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No pipeline state at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(fs_error("reading", &path, e)),
        };

        match serde_json::from_str(&text) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!(
                    "Ignoring malformed pipeline state {}: {e}",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Writes the state file into `working_dir`, stamping `updated_at`.
    pub fn save(&mut self, working_dir: &Path) -> CoreResult<()> {
        self.updated_at = Some(Utc::now());
        let path = working_dir.join(STATE_FILE_NAME);
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::JsonParseError(format!("serializing pipeline state: {e}")))?;
        fs::write(&path, text).map_err(|e| fs_error("writing", &path, e))?;
        log::debug!("Saved pipeline state to {}", path.display());
        Ok(())
    }
}
