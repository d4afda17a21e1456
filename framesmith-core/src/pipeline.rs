//! The extract -> interpolate -> encode pipeline.
//!
//! [`run_pipeline`] runs the selected stages in order against one working
//! directory. Stages communicate only through the folders on disk and the
//! persisted [`PipelineState`], so any subset of stages can be re-run later
//! (for example `--steps 3` to re-encode with a different container).

use crate::config::{CoreConfig, InterpolationMode};
use crate::engine::InterpolationEngine;
use crate::error::{CoreError, CoreResult};
use crate::external::{Encoder, Extractor, MetadataProbe};
use crate::frames::{count_frames, list_frames};
use crate::interpolation::{interpolate_dynamic_scaled, interpolate_static};
use crate::progress_reporting;
use crate::state::PipelineState;
use crate::utils::{clear_dir, commit_folder, format_duration};
use crate::workspace::{RunLock, WorkingDirectory};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// A pipeline stage. Stages always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Extract,
    Interpolate,
    Encode,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Self::Extract, Self::Interpolate, Self::Encode];

    /// 1-based step number used on the command line.
    pub fn number(self) -> u8 {
        match self {
            Self::Extract => 1,
            Self::Interpolate => 2,
            Self::Encode => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Interpolate => "interpolate",
            Self::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted || stage.number().to_string() == wanted)
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "Unknown step '{s}' (expected 1, 2, 3 or extract, interpolate, encode)"
                ))
            })
    }
}

/// The subset of stages a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSelection {
    selected: [bool; 3],
}

impl StageSelection {
    pub fn all() -> Self {
        Self { selected: [true; 3] }
    }

    pub fn from_stages(stages: &[Stage]) -> Self {
        let mut selected = [false; 3];
        for stage in stages {
            selected[usize::from(stage.number() - 1)] = true;
        }
        Self { selected }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.selected[usize::from(stage.number() - 1)]
    }

    pub fn is_empty(&self) -> bool {
        !self.selected.iter().any(|s| *s)
    }

    /// Selected stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|stage| self.contains(*stage))
    }
}

impl Default for StageSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for StageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Stage::name).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for StageSelection {
    type Err = CoreError;

    /// Parses `1,2,3`, `extract,encode` or a mix. Order and repeats do not matter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<CoreResult<Vec<Stage>>>()?;
        if stages.is_empty() {
            return Err(CoreError::Config("No pipeline steps selected".to_string()));
        }
        Ok(Self::from_stages(&stages))
    }
}

/// The external pieces a pipeline run drives.
pub struct Collaborators<'a> {
    pub engine: &'a dyn InterpolationEngine,
    pub extractor: &'a dyn Extractor,
    pub encoder: &'a dyn Encoder,
    pub probe: &'a dyn MetadataProbe,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub working_dir: PathBuf,
    pub stages_run: Vec<Stage>,
    pub extracted_frames: Option<u64>,
    pub interpolated_frames: Option<u64>,
    pub output_video: Option<PathBuf>,
    pub output_fps: Option<f64>,
    pub elapsed: Duration,
}

/// Output file name suffix describing how the video was made (`-rife-ncnn-4x-dynamic-loop`).
///
/// Looping only changes dynamic passes, so `-loop` is left off in static mode.
pub fn output_suffix(config: &CoreConfig) -> String {
    let mut suffix = format!("-{}-{}x", config.engine.name(), config.multiplier);
    match (config.mode, config.loop_video) {
        (InterpolationMode::Dynamic, true) => suffix.push_str("-dynamic-loop"),
        (InterpolationMode::Dynamic, false) => suffix.push_str("-dynamic"),
        (InterpolationMode::Static, true) => {
            log::warn!("--loop has no effect in static mode");
        }
        (InterpolationMode::Static, false) => {}
    }
    suffix
}

/// `<stem><suffix>.<video_type>`
pub fn output_file_name(stem: &str, suffix: &str, video_type: &str) -> String {
    format!("{stem}{suffix}.{}", video_type.trim_start_matches('.'))
}

/// Runs the selected stages of `config` with the given collaborators.
///
/// Fails fast: the first failing stage aborts the run, its error wrapped with
/// [`CoreError::Stage`]. Whatever earlier stages produced stays on disk.
pub fn run_pipeline(config: &CoreConfig, collaborators: &Collaborators<'_>) -> CoreResult<PipelineReport> {
    let started = Instant::now();
    config.validate()?;

    let dir = WorkingDirectory::create(config.working_dir()?)?;
    let _lock = RunLock::acquire(&dir)?;
    let mut state = PipelineState::load(dir.root())?;

    let suffix = output_suffix(config);
    state.output_suffix = Some(suffix.clone());
    state.save(dir.root())?;

    log::info!(
        "Working directory: {} (steps: {}, engine: {}, {}x {})",
        dir.root().display(),
        config.steps,
        config.engine,
        config.multiplier,
        config.mode
    );

    let mut report = PipelineReport {
        working_dir: dir.root().to_path_buf(),
        stages_run: Vec::new(),
        extracted_frames: state.extracted_frame_count,
        interpolated_frames: state.interpolated_frame_count,
        output_video: None,
        output_fps: None,
        elapsed: Duration::ZERO,
    };

    for stage in config.steps.iter() {
        let stage_started = Instant::now();
        let result = match stage {
            Stage::Extract => {
                progress_reporting::stage_started(stage, &config.input_file.display().to_string());
                extract_stage(config, &dir, collaborators.extractor, &mut state).map(|count| {
                    report.extracted_frames = Some(count);
                })
            }
            Stage::Interpolate => {
                progress_reporting::stage_started(
                    stage,
                    &format!("{} {}x {}", config.engine, config.multiplier, config.mode),
                );
                interpolate_stage(config, &dir, collaborators.engine, &mut state).map(|count| {
                    report.interpolated_frames = Some(count);
                })
            }
            Stage::Encode => {
                progress_reporting::stage_started(stage, &suffix);
                encode_stage(config, &dir, collaborators, &mut state, &suffix).map(|(video, fps)| {
                    report.output_video = Some(video);
                    report.output_fps = Some(fps);
                })
            }
        };

        if let Err(e) = result {
            log::error!("Stage {stage} failed: {e}");
            progress_reporting::error(&format!("Stage {stage} failed"));
            return Err(e.in_stage(stage));
        }
        state.save(dir.root()).map_err(|e| e.in_stage(stage))?;
        report.stages_run.push(stage);
        log::info!(
            "Stage {stage} finished in {}",
            format_duration(stage_started.elapsed())
        );
    }

    report.elapsed = started.elapsed();
    progress_reporting::success(&format!(
        "Finished {} in {}",
        config.steps,
        format_duration(report.elapsed)
    ));
    Ok(report)
}

fn extract_stage(
    config: &CoreConfig,
    dir: &WorkingDirectory,
    extractor: &dyn Extractor,
    state: &mut PipelineState,
) -> CoreResult<u64> {
    let folder = dir.original_frames();
    clear_dir(&folder)?;

    let reported = extractor.extract(&config.input_file, &folder)?;
    let counted = count_frames(&folder)?;
    if counted != reported {
        log::warn!("Extractor reported {reported} frames but {counted} are on disk; using {counted}");
    }
    if counted == 0 {
        return Err(CoreError::NoFrames(folder));
    }

    log::info!("Extracted {counted} frames");
    state.extracted_frame_count = Some(counted);
    Ok(counted)
}

fn interpolate_stage(
    config: &CoreConfig,
    dir: &WorkingDirectory,
    engine: &dyn InterpolationEngine,
    state: &mut PipelineState,
) -> CoreResult<u64> {
    let input = dir.original_frames();
    let frames = count_frames(&input)?;
    if frames == 0 {
        return Err(CoreError::NoFrames(input));
    }
    let output = dir.interpolated_frames();

    let produced = match config.mode {
        InterpolationMode::Static => {
            interpolate_static(engine, &input, &output, config.multiplier, config.keep_intermediate)?
        }
        InterpolationMode::Dynamic => {
            let original_count = original_frame_count(&input, state)?;
            let staging = dir.dynamic_staging(config.multiplier);
            clear_dir(&staging)?;
            interpolate_dynamic_scaled(
                engine,
                &input,
                &staging,
                original_count,
                config.multiplier,
                config.loop_video,
            )?;
            commit_folder(&staging, &output)?;
            count_frames(&output)?
        }
    };

    log::info!("Interpolated {frames} frames into {produced}");
    state.interpolated_frame_count = Some(produced);
    Ok(produced)
}

/// Frame count of the source before any frames were removed.
fn original_frame_count(input: &Path, state: &PipelineState) -> CoreResult<u64> {
    if let Some(count) = state.extracted_frame_count {
        return Ok(count);
    }
    let last = list_frames(input)?.last().map(|f| f.index).unwrap_or(0);
    log::warn!(
        "No extracted frame count recorded; assuming the source ended at frame {last}"
    );
    Ok(last)
}

fn encode_stage(
    config: &CoreConfig,
    dir: &WorkingDirectory,
    collaborators: &Collaborators<'_>,
    state: &mut PipelineState,
    suffix: &str,
) -> CoreResult<(PathBuf, f64)> {
    let input = dir.interpolated_frames();
    if count_frames(&input)? == 0 {
        return Err(CoreError::NoFrames(input));
    }

    let source_fps = source_frame_rate(config, collaborators.probe, state)?;
    state.source_fps = Some(source_fps);
    let output_fps = source_fps * f64::from(config.multiplier);

    let output = dir
        .output_videos()
        .join(output_file_name(&config.input_stem()?, suffix, &config.video_type));
    collaborators.encoder.encode(&input, &output, output_fps)?;

    log::info!("Encoded {} at {output_fps:.3} fps", output.display());
    Ok((output, output_fps))
}

/// The rate the encode multiplies: the override, else the probed rate, else
/// the rate recorded by an earlier run when the input is no longer available.
fn source_frame_rate(
    config: &CoreConfig,
    probe: &dyn MetadataProbe,
    state: &PipelineState,
) -> CoreResult<f64> {
    if let Some(fps) = config.input_fps {
        log::info!("Using input frame rate override: {fps}");
        return Ok(fps);
    }
    if config.input_file.is_file() {
        let rates = probe.probe(&config.input_file)?;
        if rates.is_variable().unwrap_or(false) {
            log::warn!(
                "Input has a variable frame rate (real {}, average {}); using the real rate",
                rates.real_fps,
                rates.average_fps
            );
        }
        return rates.real();
    }
    state.source_fps.ok_or_else(|| {
        CoreError::Config(format!(
            "Cannot determine the frame rate: '{}' is missing and no rate was recorded; pass --input-fps",
            config.input_file.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineKind;

    #[test]
    fn test_stage_parsing() {
        assert_eq!("2".parse::<Stage>().unwrap(), Stage::Interpolate);
        assert_eq!("Encode".parse::<Stage>().unwrap(), Stage::Encode);
        assert!("4".parse::<Stage>().is_err());
    }

    #[test]
    fn test_selection_parsing_is_ordered() {
        let selection: StageSelection = "3,1".parse().unwrap();
        let stages: Vec<Stage> = selection.iter().collect();
        assert_eq!(stages, vec![Stage::Extract, Stage::Encode]);
        assert_eq!(selection.to_string(), "extract,encode");

        let mixed: StageSelection = "interpolate, 3".parse().unwrap();
        assert!(!mixed.contains(Stage::Extract));
        assert!(mixed.contains(Stage::Encode));

        assert!("".parse::<StageSelection>().is_err());
        assert!("1,x".parse::<StageSelection>().is_err());
        assert_eq!(StageSelection::default(), "1,2,3".parse().unwrap());
    }

    #[test]
    fn test_output_suffix() {
        let mut config = CoreConfig::new("clip.mp4", "out");
        assert_eq!(output_suffix(&config), "-dain-ncnn-2x");

        config.loop_video = true;
        assert_eq!(output_suffix(&config), "-dain-ncnn-2x");

        config.engine = EngineKind::RifeNcnn;
        config.mode = InterpolationMode::Dynamic;
        config.loop_video = true;
        config.multiplier = 3;
        assert_eq!(output_suffix(&config), "-rife-ncnn-3x-dynamic-loop");

        assert_eq!(
            output_file_name("clip", "-rife-ncnn-3x", ".mkv"),
            "clip-rife-ncnn-3x.mkv"
        );
    }
}
