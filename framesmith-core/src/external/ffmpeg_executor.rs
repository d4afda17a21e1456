//! ffmpeg execution through ffmpeg-sidecar.
//!
//! [`FfmpegSpawner`]/[`FfmpegProcess`] abstract the running process so the
//! extractor and encoder can be exercised against scripted event streams.
//! Progress frames reported by ffmpeg are forwarded to the global progress
//! reporter as absolute positions.

use super::{Encoder, Extractor};
use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error, fs_error};
use crate::frames::{FRAME_PATTERN, count_frames};
use crate::progress_reporting;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Quality used when assembling frames into a video.
pub const ENCODE_CRF: &str = "18";

/// An ffmpeg process whose events can be consumed.
pub trait FfmpegProcess {
    /// Feeds every event of the running command to `handler`.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Something that can start an ffmpeg command.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// [`FfmpegProcess`] over an ffmpeg-sidecar child.
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            command_failed_error("ffmpeg (event iterator)", ExitStatus::default(), e.to_string())
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// Spawns commands with ffmpeg-sidecar.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

fn new_command(ffmpeg_path: Option<&Path>) -> FfmpegCommand {
    match ffmpeg_path {
        Some(path) => FfmpegCommand::new_with_path(path),
        None => FfmpegCommand::new(),
    }
}

fn run_ffmpeg<S: FfmpegSpawner>(spawner: &S, cmd: FfmpegCommand, label: &str) -> CoreResult<()> {
    log::debug!("Running {label}: {cmd:?}");
    let mut process = spawner.spawn(cmd)?;

    progress_reporting::progress_started(label, None);
    let mut stderr_buffer = String::new();
    let handled = process.handle_events(|event| {
        match event {
            FfmpegEvent::Log(_level, message) => {
                stderr_buffer.push_str(&message);
                stderr_buffer.push('\n');
            }
            FfmpegEvent::Error(error) => {
                stderr_buffer.push_str(&format!("ERROR: {error}\n"));
            }
            FfmpegEvent::Progress(progress) => {
                progress_reporting::progress_position(u64::from(progress.frame));
            }
            _ => {}
        }
        Ok(())
    });
    progress_reporting::progress_finished();
    handled?;

    let status = process.wait()?;
    if !status.success() {
        log::error!("{label} failed: {status}");
        return Err(command_failed_error(label, status, stderr_buffer));
    }
    Ok(())
}

/// [`Extractor`] that dumps every frame as an RGB PNG.
#[derive(Debug, Clone, Default)]
pub struct FfmpegExtractor<S: FfmpegSpawner = SidecarSpawner> {
    spawner: S,
    ffmpeg_path: Option<PathBuf>,
}

impl FfmpegExtractor<SidecarSpawner> {
    pub fn new(ffmpeg_path: Option<PathBuf>) -> Self {
        Self::with_spawner(SidecarSpawner, ffmpeg_path)
    }
}

impl<S: FfmpegSpawner> FfmpegExtractor<S> {
    pub fn with_spawner(spawner: S, ffmpeg_path: Option<PathBuf>) -> Self {
        Self { spawner, ffmpeg_path }
    }

    pub(crate) fn command(&self, input_video: &Path, output_folder: &Path) -> FfmpegCommand {
        let mut cmd = new_command(self.ffmpeg_path.as_deref());
        cmd.input(input_video.to_string_lossy().as_ref())
            .args(["-vsync", "cfr", "-pix_fmt", "rgb24"])
            .output(output_folder.join(FRAME_PATTERN).to_string_lossy().as_ref());
        cmd
    }
}

impl<S: FfmpegSpawner> Extractor for FfmpegExtractor<S> {
    fn extract(&self, input_video: &Path, output_folder: &Path) -> CoreResult<u64> {
        fs::create_dir_all(output_folder).map_err(|e| fs_error("creating", output_folder, e))?;
        log::info!(
            "Extracting frames: {} -> {}",
            input_video.display(),
            output_folder.display()
        );
        let cmd = self.command(input_video, output_folder);
        run_ffmpeg(&self.spawner, cmd, "ffmpeg (extract)")?;
        count_frames(output_folder)
    }
}

/// [`Encoder`] that assembles a numbered PNG sequence into an H.264 video.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder<S: FfmpegSpawner = SidecarSpawner> {
    spawner: S,
    ffmpeg_path: Option<PathBuf>,
}

impl FfmpegEncoder<SidecarSpawner> {
    pub fn new(ffmpeg_path: Option<PathBuf>) -> Self {
        Self::with_spawner(SidecarSpawner, ffmpeg_path)
    }
}

impl<S: FfmpegSpawner> FfmpegEncoder<S> {
    pub fn with_spawner(spawner: S, ffmpeg_path: Option<PathBuf>) -> Self {
        Self { spawner, ffmpeg_path }
    }

    pub(crate) fn command(&self, input_folder: &Path, output_video: &Path, framerate: f64) -> FfmpegCommand {
        let rate = format_framerate(framerate);
        let mut cmd = new_command(self.ffmpeg_path.as_deref());
        cmd.args(["-framerate", rate.as_str()])
            .input(input_folder.join(FRAME_PATTERN).to_string_lossy().as_ref())
            .args(["-crf", ENCODE_CRF, "-pix_fmt", "yuv420p"])
            .overwrite()
            .output(output_video.to_string_lossy().as_ref());
        cmd
    }
}

impl<S: FfmpegSpawner> Encoder for FfmpegEncoder<S> {
    fn encode(&self, input_folder: &Path, output_video: &Path, framerate: f64) -> CoreResult<()> {
        if let Some(parent) = output_video.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error("creating", parent, e))?;
        }
        log::info!(
            "Encoding {} at {framerate:.3} fps -> {}",
            input_folder.display(),
            output_video.display()
        );
        let cmd = self.command(input_folder, output_video, framerate);
        run_ffmpeg(&self.spawner, cmd, "ffmpeg (encode)")
    }
}

/// Frame rate as passed to `-framerate`, without trailing zeros (`59.94006`, `48`).
fn format_framerate(framerate: f64) -> String {
    let text = format!("{framerate:.6}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
