//! Core library for Framesmith, a frame interpolation pipeline.
//!
//! Framesmith raises the frame rate of a video by extracting its frames with
//! ffmpeg, synthesizing new frames in between with an ncnn-vulkan
//! interpolation engine (DAIN, CAIN or RIFE), and encoding the result.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use framesmith_core::config::CoreConfigBuilder;
//! use framesmith_core::engine::{EngineKind, NcnnEngine};
//! use framesmith_core::external::{CrateFfprobeExecutor, FfmpegEncoder, FfmpegExtractor};
//! use framesmith_core::pipeline::{Collaborators, run_pipeline};
//!
//! let config = CoreConfigBuilder::new()
//!     .input_file("/videos/clip.mp4")
//!     .output_root("/videos/out")
//!     .engine(EngineKind::RifeNcnn)
//!     .multiplier(2)
//!     .build()
//!     .unwrap();
//!
//! let engine = NcnnEngine::new(config.engine, config.engine_binary(), config.engine_settings.clone());
//! let extractor = FfmpegExtractor::new(None);
//! let encoder = FfmpegEncoder::new(None);
//! let probe = CrateFfprobeExecutor::new();
//!
//! let report = run_pipeline(
//!     &config,
//!     &Collaborators {
//!         engine: &engine,
//!         extractor: &extractor,
//!         encoder: &encoder,
//!         probe: &probe,
//!     },
//! )
//! .unwrap();
//! println!("{:?}", report.output_video);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod external;
pub mod frames;
pub mod interpolation;
pub mod pipeline;
pub mod progress_reporting;
pub mod state;
pub mod utils;
pub mod workspace;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder, InterpolationMode};
pub use engine::classifier::{EngineErrorKind, ProgressEvent};
pub use engine::{EngineKind, EngineSettings, InterpolationEngine, NcnnEngine};
pub use error::{CoreError, CoreResult, ErrorCategory};
pub use frames::count_frames;
pub use pipeline::{Collaborators, PipelineReport, Stage, StageSelection, run_pipeline};
pub use state::PipelineState;
pub use utils::{format_duration, parse_frame_rate};
pub use workspace::{RunLock, WorkingDirectory};
