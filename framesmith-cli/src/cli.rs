// framesmith-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand};
use framesmith_core::config::InterpolationMode;
use framesmith_core::engine::EngineKind;
use framesmith_core::pipeline::StageSelection;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Framesmith: frame interpolation pipeline",
    long_about = "Raises the frame rate of a video: extracts frames with ffmpeg, \
                  interpolates them with dain-ncnn-vulkan, cain-ncnn-vulkan or \
                  rife-ncnn-vulkan, and encodes the result."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output on the console.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show trace output on the console, including every engine line.
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the extract / interpolate / encode pipeline on one video
    Interpolate(InterpolateArgs),
    /// Prints the frame rates of a video and the state of its working directory
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
pub struct InterpolateArgs {
    /// Input video file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_VIDEO")]
    pub input_file: PathBuf,

    /// Folder that receives the working directory (<OUTPUT_DIR>/<input name>)
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Interpolation engine: dain-ncnn, cain-ncnn or rife-ncnn
    #[arg(short, long, default_value = "dain-ncnn", value_name = "ENGINE")]
    pub engine: EngineKind,

    /// Path to the engine executable (defaults to <engine>-vulkan on PATH).
    /// Can also be set via the FRAMESMITH_ENGINE_PATH environment variable.
    #[arg(long, value_name = "PATH", env = "FRAMESMITH_ENGINE_PATH")]
    pub engine_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (defaults to ffmpeg on PATH)
    #[arg(long, value_name = "PATH", env = "FRAMESMITH_FFMPEG")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Frame rate multiplier (cain-ncnn needs a power of two)
    #[arg(
        short,
        long,
        default_value_t = 2,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub multiplier: u32,

    /// static: uniform multiplication; dynamic: fill gaps left by removed frames
    #[arg(long, default_value = "static", value_name = "MODE")]
    pub mode: InterpolationMode,

    /// Interpolate between the last and the first frame (dynamic mode)
    #[arg(long = "loop", default_value_t = false)]
    pub loop_video: bool,

    /// Container of the encoded video
    #[arg(long, default_value = "mp4", value_name = "EXT")]
    pub video_type: String,

    /// Stages to run, e.g. `1,2,3` or `interpolate,encode`
    #[arg(long, default_value = "1,2,3", value_name = "STEPS")]
    pub steps: StageSelection,

    /// Source frame rate to use instead of probing the input (e.g. 23.976 or 24000/1001)
    #[arg(long, value_name = "FPS", value_parser = parse_input_fps)]
    pub input_fps: Option<f64>,

    /// Engine tile size (-t); a comma list for multiple GPUs
    #[arg(long, value_name = "SIZE")]
    pub tile_size: Option<String>,

    /// Engine GPU id (-g), `auto` or e.g. `0,1`
    #[arg(long, value_name = "ID")]
    pub gpu_id: Option<String>,

    /// Engine load:process:save thread counts (-j), e.g. `1:2:2`
    #[arg(long, value_name = "THREADS")]
    pub threads: Option<String>,

    /// Kill an engine invocation after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Keep the intermediate folders of a chained interpolation
    #[arg(long, default_value_t = false)]
    pub keep_intermediate: bool,

    /// Optional: Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Video file to inspect
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_VIDEO")]
    pub input_file: PathBuf,

    /// Output folder of a previous run, to report its working directory
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

fn parse_input_fps(value: &str) -> Result<f64, String> {
    framesmith_core::parse_frame_rate(value).map_err(|e| e.to_string())
}
