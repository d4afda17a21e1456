//! External collaborators: ffmpeg, ffprobe and dependency checks.
//!
//! The pipeline only sees the [`Extractor`], [`Encoder`] and [`MetadataProbe`]
//! traits. The ffmpeg-sidecar and ffprobe-crate implementations live in the
//! submodules; tests substitute their own.

use crate::error::{CoreError, CoreResult};
use crate::utils::parse_frame_rate;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

pub mod ffmpeg_executor;
pub mod ffprobe_executor;

pub use ffmpeg_executor::{
    FfmpegEncoder, FfmpegExtractor, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner,
};
pub use ffprobe_executor::CrateFfprobeExecutor;

/// Splits a video into numbered frame images.
pub trait Extractor {
    /// Writes every frame of `input_video` into `output_folder` and returns the frame count.
    fn extract(&self, input_video: &Path, output_folder: &Path) -> CoreResult<u64>;
}

/// Assembles numbered frame images into a video.
pub trait Encoder {
    fn encode(&self, input_folder: &Path, output_video: &Path, framerate: f64) -> CoreResult<()>;
}

/// Reads stream metadata from a video.
pub trait MetadataProbe {
    fn probe(&self, input_video: &Path) -> CoreResult<StreamRates>;
}

/// Frame rates of the first video stream, as reported (`"30000/1001"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRates {
    /// Base rate of the stream (`r_frame_rate`).
    pub real_fps: String,
    /// Average rate over the whole stream (`avg_frame_rate`).
    pub average_fps: String,
}

impl StreamRates {
    pub fn real(&self) -> CoreResult<f64> {
        parse_frame_rate(&self.real_fps)
    }

    pub fn average(&self) -> CoreResult<f64> {
        parse_frame_rate(&self.average_fps)
    }

    /// True when frames were dropped or the stream has a variable rate.
    pub fn is_variable(&self) -> CoreResult<bool> {
        Ok((self.real()? - self.average()?).abs() > 1e-3)
    }
}

/// Checks that `cmd_name` can be launched, running it with `-version`.
pub fn check_dependency(cmd_name: impl AsRef<OsStr>) -> CoreResult<()> {
    check_program(cmd_name, &["-version"])
}

/// Checks that `program` can be launched with the given harmless arguments.
///
/// Only a failure to start counts; the exit status is ignored since several
/// tools exit non-zero after printing their usage.
pub fn check_program(program: impl AsRef<OsStr>, args: &[&str]) -> CoreResult<()> {
    let program = program.as_ref();
    let name = program.to_string_lossy().into_owned();
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{name}' not found.");
            Err(CoreError::DependencyNotFound(name))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{name}': {e}");
            Err(CoreError::CommandStart(name, e))
        }
    }
}
