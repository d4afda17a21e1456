//! Interpolation engines.
//!
//! The interpolation itself is done by external ncnn-vulkan binaries. This
//! module describes what each engine family can do ([`EngineKind`]), the
//! settings passed through to it ([`EngineSettings`]), and the
//! [`InterpolationEngine`] trait the pipeline drives. [`NcnnEngine`] is the
//! process-backed implementation.

pub mod classifier;
pub mod process;

use crate::error::{CoreError, CoreResult, fs_error};
use crate::progress_reporting;
use classifier::{ProgressClassifier, ProgressEvent, classifier_for};
use process::{EngineCommand, ProcessSpawner, StdProcessSpawner, command_in_binary_dir, run_engine};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default GPU selection passed to the engines.
pub const DEFAULT_GPU_ID: &str = "auto";

/// Default load:process:save thread counts passed to the engines.
pub const DEFAULT_THREADS: &str = "1:1:1";

/// Supported engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    DainNcnn,
    CainNcnn,
    RifeNcnn,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [Self::DainNcnn, Self::CainNcnn, Self::RifeNcnn];

    /// Short name used on the command line and in output file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::DainNcnn => "dain-ncnn",
            Self::CainNcnn => "cain-ncnn",
            Self::RifeNcnn => "rife-ncnn",
        }
    }

    /// Executable name looked up on PATH when no explicit path is configured.
    pub fn default_binary(self) -> &'static str {
        match self {
            Self::DainNcnn => "dain-ncnn-vulkan",
            Self::CainNcnn => "cain-ncnn-vulkan",
            Self::RifeNcnn => "rife-ncnn-vulkan",
        }
    }

    /// Prefix for working folders created on behalf of this engine (`cain-2x`).
    pub fn folder_prefix(self) -> &'static str {
        match self {
            Self::DainNcnn => "dain",
            Self::CainNcnn => "cain",
            Self::RifeNcnn => "rife",
        }
    }

    pub fn default_tile_size(self) -> &'static str {
        match self {
            Self::CainNcnn => "512",
            Self::DainNcnn | Self::RifeNcnn => "256",
        }
    }

    /// True when folder mode accepts an arbitrary target frame count.
    /// Otherwise every folder-mode run doubles the frame count.
    pub fn supports_target_count(self) -> bool {
        !matches!(self, Self::CainNcnn)
    }

    /// True when file mode accepts a time-step other than 0.5.
    pub fn supports_time_step(self) -> bool {
        !matches!(self, Self::CainNcnn)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted || k.default_binary() == wanted)
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "Unknown interpolation engine '{s}' (expected one of: dain-ncnn, cain-ncnn, rife-ncnn)"
                ))
            })
    }
}

/// Settings passed through to the engine binary unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Tile size (`-t`); `None` uses the engine default. May be a comma list for multi-GPU.
    pub tile_size: Option<String>,
    /// GPU id (`-g`), `auto` or e.g. `0,1`.
    pub gpu_id: String,
    /// Thread counts (`-j`), e.g. `1:2:2`.
    pub threads: String,
    /// Ask the engine for per-frame output (`-v`), needed for progress ticks.
    pub verbose: bool,
    /// Terminate an invocation that runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tile_size: None,
            gpu_id: DEFAULT_GPU_ID.to_string(),
            threads: DEFAULT_THREADS.to_string(),
            verbose: true,
            timeout: None,
        }
    }
}

/// Operations the pipeline needs from an interpolation engine.
pub trait InterpolationEngine {
    fn kind(&self) -> EngineKind;

    /// Interpolates every frame in `input` into `output`.
    ///
    /// `target_frames` is honoured only by engines that
    /// [support it](EngineKind::supports_target_count); doubling engines ignore it.
    fn folder_mode(&self, input: &Path, output: &Path, target_frames: Option<u64>) -> CoreResult<()>;

    /// Synthesizes one frame between `frame0` and `frame1` at `time_step`.
    fn file_mode(&self, frame0: &Path, frame1: &Path, output: &Path, time_step: f64) -> CoreResult<()>;
}

/// [`InterpolationEngine`] backed by an ncnn-vulkan executable.
pub struct NcnnEngine<S: ProcessSpawner = StdProcessSpawner> {
    kind: EngineKind,
    binary: PathBuf,
    settings: EngineSettings,
    classifier: Box<dyn ProgressClassifier>,
    spawner: S,
}

impl NcnnEngine<StdProcessSpawner> {
    pub fn new(kind: EngineKind, binary: impl Into<PathBuf>, settings: EngineSettings) -> Self {
        Self::with_spawner(kind, binary, settings, StdProcessSpawner)
    }
}

impl<S: ProcessSpawner> NcnnEngine<S> {
    pub fn with_spawner(
        kind: EngineKind,
        binary: impl Into<PathBuf>,
        settings: EngineSettings,
        spawner: S,
    ) -> Self {
        Self {
            kind,
            binary: binary.into(),
            settings,
            classifier: classifier_for(kind),
            spawner,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn tile_size(&self) -> &str {
        self.settings
            .tile_size
            .as_deref()
            .unwrap_or_else(|| self.kind.default_tile_size())
    }

    fn push_common_args(&self, command: &mut EngineCommand) {
        command
            .arg("-t")
            .arg(self.tile_size())
            .arg("-g")
            .arg(&self.settings.gpu_id)
            .arg("-j")
            .arg(&self.settings.threads);
    }

    pub(crate) fn folder_command(
        &self,
        input: &Path,
        output: &Path,
        target_frames: Option<u64>,
    ) -> EngineCommand {
        let mut command = command_in_binary_dir(&self.binary);
        command
            .arg("-i")
            .arg(absolute(input))
            .arg("-o")
            .arg(absolute(output));
        if self.kind.supports_target_count() {
            if let Some(target) = target_frames {
                command.arg("-n").arg(target.to_string());
            }
        }
        self.push_common_args(&mut command);
        if self.settings.verbose {
            command.arg("-v");
        }
        command
    }

    pub(crate) fn file_command(
        &self,
        frame0: &Path,
        frame1: &Path,
        output: &Path,
        time_step: f64,
    ) -> EngineCommand {
        let mut command = command_in_binary_dir(&self.binary);
        command
            .arg("-0")
            .arg(absolute(frame0))
            .arg("-1")
            .arg(absolute(frame1))
            .arg("-o")
            .arg(absolute(output));
        if self.kind.supports_time_step() {
            command.arg("-s").arg(format!("{time_step:.6}"));
        }
        self.push_common_args(&mut command);
        command
    }

    fn run(&self, command: &EngineCommand) -> CoreResult<()> {
        run_engine(
            &self.spawner,
            command,
            self.kind.name(),
            self.classifier.as_ref(),
            self.settings.timeout,
            |event| {
                if matches!(event, ProgressEvent::Tick) {
                    progress_reporting::progress_tick();
                }
            },
        )
        .map(|_| ())
    }
}

impl<S: ProcessSpawner> InterpolationEngine for NcnnEngine<S> {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn folder_mode(&self, input: &Path, output: &Path, target_frames: Option<u64>) -> CoreResult<()> {
        fs::create_dir_all(output).map_err(|e| fs_error("creating", output, e))?;
        let command = self.folder_command(input, output, target_frames);
        self.run(&command)
    }

    fn file_mode(&self, frame0: &Path, frame1: &Path, output: &Path, time_step: f64) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&time_step) {
            return Err(CoreError::Config(format!(
                "Time-step {time_step} is outside [0, 1]"
            )));
        }
        if !self.kind.supports_time_step() && (time_step - 0.5).abs() > f64::EPSILON {
            return Err(CoreError::Config(format!(
                "{} only interpolates midpoints, cannot use time-step {time_step}",
                self.kind
            )));
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error("creating", parent, e))?;
        }
        let command = self.file_command(frame0, frame1, output, time_step);
        self.run(&command)
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("dain-ncnn".parse::<EngineKind>().unwrap(), EngineKind::DainNcnn);
        assert_eq!("CAIN-NCNN".parse::<EngineKind>().unwrap(), EngineKind::CainNcnn);
        assert_eq!(
            "rife-ncnn-vulkan".parse::<EngineKind>().unwrap(),
            EngineKind::RifeNcnn
        );
        assert!(matches!(
            "flowframes".parse::<EngineKind>(),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        assert!(!EngineKind::CainNcnn.supports_target_count());
        assert!(!EngineKind::CainNcnn.supports_time_step());
        assert!(EngineKind::DainNcnn.supports_target_count());
        assert!(EngineKind::RifeNcnn.supports_time_step());
        assert_eq!(EngineKind::CainNcnn.folder_prefix(), "cain");
    }

    #[test]
    fn test_folder_command_for_dain() {
        let engine = NcnnEngine::new(
            EngineKind::DainNcnn,
            "/opt/dain/dain-ncnn-vulkan",
            EngineSettings::default(),
        );
        let command = engine.folder_command(Path::new("/w/original_frames"), Path::new("/w/out"), Some(20));
        assert_eq!(command.working_dir, Some(PathBuf::from("/opt/dain")));
        assert_eq!(command.arg_value("-n"), Some(OsStr::new("20")));
        assert_eq!(command.arg_value("-t"), Some(OsStr::new("256")));
        assert_eq!(command.arg_value("-g"), Some(OsStr::new("auto")));
        assert_eq!(command.arg_value("-j"), Some(OsStr::new("1:1:1")));
        assert_eq!(command.args.last().map(|a| a.as_os_str()), Some(OsStr::new("-v")));
    }

    #[test]
    fn test_folder_command_for_cain_ignores_target() {
        let settings = EngineSettings {
            tile_size: Some("384".to_string()),
            verbose: false,
            ..EngineSettings::default()
        };
        let engine = NcnnEngine::new(EngineKind::CainNcnn, "cain-ncnn-vulkan", settings);
        let command = engine.folder_command(Path::new("/a"), Path::new("/b"), Some(40));
        assert_eq!(command.arg_value("-n"), None);
        assert_eq!(command.arg_value("-t"), Some(OsStr::new("384")));
        assert!(!command.args.iter().any(|a| a == "-v"));
    }

    #[test]
    fn test_file_command_time_step() {
        let engine = NcnnEngine::new(EngineKind::RifeNcnn, "rife-ncnn-vulkan", EngineSettings::default());
        let command = engine.file_command(Path::new("/a/1.png"), Path::new("/a/3.png"), Path::new("/b/2.png"), 0.25);
        assert_eq!(command.arg_value("-s"), Some(OsStr::new("0.250000")));
        assert_eq!(command.arg_value("-0"), Some(OsStr::new("/a/1.png")));

        let cain = NcnnEngine::new(EngineKind::CainNcnn, "cain-ncnn-vulkan", EngineSettings::default());
        let command = cain.file_command(Path::new("/a/1.png"), Path::new("/a/2.png"), Path::new("/b/x.png"), 0.5);
        assert_eq!(command.arg_value("-s"), None);
    }

    #[test]
    fn test_cain_rejects_non_midpoint_time_step() {
        let cain = NcnnEngine::new(EngineKind::CainNcnn, "cain-ncnn-vulkan", EngineSettings::default());
        let result = cain.file_mode(Path::new("a.png"), Path::new("b.png"), Path::new("c.png"), 0.25);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
