//! Fluent builder for [`CoreConfig`].

use super::{CoreConfig, InterpolationMode};
use crate::engine::{EngineKind, EngineSettings};
use crate::error::{CoreError, CoreResult};
use crate::pipeline::StageSelection;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for [`CoreConfig`].
///
/// Only the input file and output root are required; everything else starts
/// from the [`CoreConfig::new`] defaults. [`build`](Self::build) validates
/// the result.
///
/// ```rust,no_run
/// use framesmith_core::config::{CoreConfigBuilder, InterpolationMode};
/// use framesmith_core::engine::EngineKind;
///
/// let config = CoreConfigBuilder::new()
///     .input_file("/videos/clip.mp4")
///     .output_root("/videos/out")
///     .engine(EngineKind::CainNcnn)
///     .multiplier(4)
///     .mode(InterpolationMode::Static)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    input_file: Option<PathBuf>,
    output_root: Option<PathBuf>,
    engine: Option<EngineKind>,
    engine_path: Option<PathBuf>,
    settings: EngineSettings,
    mode: InterpolationMode,
    multiplier: Option<u32>,
    loop_video: bool,
    video_type: Option<String>,
    steps: Option<StageSelection>,
    input_fps: Option<f64>,
    keep_intermediate: bool,
}

impl CoreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = Some(path.into());
        self
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = Some(path.into());
        self
    }

    /// Tile size passed as `-t`; may be a comma list when several GPUs are used.
    pub fn tile_size(mut self, tile_size: impl Into<String>) -> Self {
        self.settings.tile_size = Some(tile_size.into());
        self
    }

    pub fn gpu_id(mut self, gpu_id: impl Into<String>) -> Self {
        self.settings.gpu_id = gpu_id.into();
        self
    }

    /// Load:process:save thread counts, e.g. `1:2:2`.
    pub fn threads(mut self, threads: impl Into<String>) -> Self {
        self.settings.threads = threads.into();
        self
    }

    pub fn verbose_engine(mut self, verbose: bool) -> Self {
        self.settings.verbose = verbose;
        self
    }

    pub fn engine_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    pub fn mode(mut self, mode: InterpolationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn loop_video(mut self, loop_video: bool) -> Self {
        self.loop_video = loop_video;
        self
    }

    pub fn video_type(mut self, video_type: impl Into<String>) -> Self {
        self.video_type = Some(video_type.into());
        self
    }

    pub fn steps(mut self, steps: StageSelection) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn input_fps(mut self, fps: f64) -> Self {
        self.input_fps = Some(fps);
        self
    }

    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Assembles and validates the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        let input_file = self
            .input_file
            .ok_or_else(|| CoreError::Config("An input video is required".to_string()))?;
        let output_root = self
            .output_root
            .ok_or_else(|| CoreError::Config("An output folder is required".to_string()))?;

        let mut config = CoreConfig::new(input_file, output_root);
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        config.engine_path = self.engine_path;
        config.engine_settings = self.settings;
        config.mode = self.mode;
        if let Some(multiplier) = self.multiplier {
            config.multiplier = multiplier;
        }
        config.loop_video = self.loop_video;
        if let Some(video_type) = self.video_type {
            config.video_type = video_type;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        config.input_fps = self.input_fps;
        config.keep_intermediate = self.keep_intermediate;

        config.validate()?;
        Ok(config)
    }
}
