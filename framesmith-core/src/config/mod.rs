//! Configuration for a framesmith run.
//!
//! A [`CoreConfig`] is built by the frontend (usually through
//! [`CoreConfigBuilder`]), validated once, and then read by the pipeline. It
//! is never mutated after the run starts.

mod builder;

use crate::engine::{EngineKind, EngineSettings};
use crate::error::{CoreError, CoreResult};
use crate::pipeline::StageSelection;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use builder::CoreConfigBuilder;

/// Default frame-rate multiplier.
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Default engine when none is requested.
pub const DEFAULT_ENGINE: EngineKind = EngineKind::DainNcnn;

/// Default container for the encoded output.
pub const DEFAULT_VIDEO_TYPE: &str = "mp4";

/// How new frames are distributed between the original ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// The same number of new frames between every pair.
    #[default]
    Static,
    /// New frames fill the gaps left by missing frame indices.
    Dynamic,
}

impl InterpolationMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(CoreError::Config(format!(
                "Unknown interpolation mode '{other}' (expected static or dynamic)"
            ))),
        }
    }
}

/// Everything the pipeline needs to know about a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Video to interpolate.
    pub input_file: PathBuf,

    /// Root under which the per-input working directory is created.
    pub output_root: PathBuf,

    pub engine: EngineKind,

    /// Explicit engine executable; `None` looks up the engine's default binary on PATH.
    pub engine_path: Option<PathBuf>,

    pub engine_settings: EngineSettings,

    pub mode: InterpolationMode,

    /// Frame-rate multiplier. Doubling engines need a power of two.
    pub multiplier: u32,

    /// Treat the video as a seamless loop: the tail interpolates back to the first frame.
    pub loop_video: bool,

    /// Output container extension, without the dot.
    pub video_type: String,

    /// Stages to run against the working directory.
    pub steps: StageSelection,

    /// Overrides the probed source frame rate.
    pub input_fps: Option<f64>,

    /// Keep the intermediate folders of a multiplier chain.
    pub keep_intermediate: bool,
}

impl CoreConfig {
    pub fn new(input_file: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_root: output_root.into(),
            engine: DEFAULT_ENGINE,
            engine_path: None,
            engine_settings: EngineSettings::default(),
            mode: InterpolationMode::default(),
            multiplier: DEFAULT_MULTIPLIER,
            loop_video: false,
            video_type: DEFAULT_VIDEO_TYPE.to_string(),
            steps: StageSelection::all(),
            input_fps: None,
            keep_intermediate: false,
        }
    }

    /// Executable used for the configured engine.
    pub fn engine_binary(&self) -> PathBuf {
        self.engine_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.engine.default_binary()))
    }

    /// Input file name without extension, used for the working directory and output name.
    pub fn input_stem(&self) -> CoreResult<String> {
        self.input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "Input path '{}' has no file name",
                    self.input_file.display()
                ))
            })
    }

    /// `<output_root>/<input_stem>`
    pub fn working_dir(&self) -> CoreResult<PathBuf> {
        Ok(self.output_root.join(self.input_stem()?))
    }

    /// Checks the combination of settings before anything touches the disk.
    pub fn validate(&self) -> CoreResult<()> {
        if self.multiplier < 1 {
            return Err(CoreError::InvalidMultiplier(self.multiplier));
        }
        if self.mode == InterpolationMode::Static && self.multiplier < 2 {
            return Err(CoreError::InvalidMultiplier(self.multiplier));
        }
        if !self.engine.supports_target_count() && !self.multiplier.is_power_of_two() {
            return Err(CoreError::InvalidMultiplier(self.multiplier));
        }
        if self.mode == InterpolationMode::Dynamic && !self.engine.supports_time_step() {
            return Err(CoreError::Config(format!(
                "{} cannot be used in dynamic mode; use dain-ncnn or rife-ncnn",
                self.engine
            )));
        }
        if let Some(fps) = self.input_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(CoreError::InvalidFrameRate(fps.to_string()));
            }
        }
        let video_type = self.video_type.trim_start_matches('.');
        if video_type.is_empty() || video_type.contains(['/', '\\']) {
            return Err(CoreError::Config(format!(
                "Invalid output video type '{}'",
                self.video_type
            )));
        }
        if self.steps.is_empty() {
            return Err(CoreError::Config("No pipeline steps selected".to_string()));
        }
        if self.steps.contains(crate::pipeline::Stage::Extract) && !self.input_file.is_file() {
            return Err(CoreError::Config(format!(
                "Input video '{}' does not exist",
                self.input_file.display()
            )));
        }
        self.input_stem()?;
        check_engine_path(self.engine_path.as_deref())
    }
}

fn check_engine_path(path: Option<&Path>) -> CoreResult<()> {
    match path {
        Some(path) if path.components().count() > 1 && !path.exists() => Err(CoreError::Config(format!(
            "Engine executable '{}' does not exist",
            path.display()
        ))),
        _ => Ok(()),
    }
}
