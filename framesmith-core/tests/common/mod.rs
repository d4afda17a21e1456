// framesmith-core/tests/common/mod.rs
//
// In-process stand-ins for the engine, ffmpeg and ffprobe. They write real
// files into the working directory so the pipeline's folder handling runs
// for real.

#![allow(dead_code)]

use framesmith_core::engine::{EngineKind, InterpolationEngine};
use framesmith_core::error::{CoreError, CoreResult};
use framesmith_core::external::{Encoder, Extractor, MetadataProbe, StreamRates};
use framesmith_core::frames::{count_frames, frame_file_name};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Creates `00000001.png`.. for each index in `indices`.
pub fn write_frames(folder: &Path, indices: impl IntoIterator<Item = u64>) {
    fs::create_dir_all(folder).expect("Failed to create frame folder");
    for index in indices {
        let mut file = File::create(folder.join(frame_file_name(index, "png")))
            .expect("Failed to create frame");
        write!(file, "frame {index}").expect("Failed to write frame");
    }
}

/// Creates an input video placeholder that the fake collaborators accept.
pub fn create_dummy_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"dummy content").expect("Failed to create dummy video");
    path
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Folder {
        input: PathBuf,
        output: PathBuf,
        target: Option<u64>,
    },
    File {
        frame0: PathBuf,
        frame1: PathBuf,
        output: PathBuf,
        time_step: f64,
    },
}

/// Engine that writes placeholder frames instead of interpolating.
///
/// Folder mode writes `target` frames when the kind supports a target count
/// and twice the input otherwise, like the real binaries.
pub struct FakeEngine {
    kind: EngineKind,
    pub calls: RefCell<Vec<EngineCall>>,
    fail_on_call: Option<usize>,
}

impl FakeEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            calls: RefCell::new(Vec::new()),
            fail_on_call: None,
        }
    }

    /// Makes the `n`th call (0-based) fail with an out-of-memory error.
    pub fn failing_on_call(kind: EngineKind, n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::new(kind)
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: EngineCall) -> CoreResult<()> {
        let mut calls = self.calls.borrow_mut();
        calls.push(call);
        if self.fail_on_call == Some(calls.len() - 1) {
            return Err(CoreError::Engine {
                engine: self.kind.name().to_string(),
                kind: framesmith_core::EngineErrorKind::OutOfMemory,
                message: "vkAllocateMemory failed".to_string(),
            });
        }
        Ok(())
    }
}

impl InterpolationEngine for FakeEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn folder_mode(&self, input: &Path, output: &Path, target_frames: Option<u64>) -> CoreResult<()> {
        self.record(EngineCall::Folder {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            target: target_frames,
        })?;
        let frames = count_frames(input)?;
        let produced = match target_frames {
            Some(target) if self.kind.supports_target_count() => target,
            _ => frames * 2,
        };
        write_frames(output, 1..=produced);
        Ok(())
    }

    fn file_mode(&self, frame0: &Path, frame1: &Path, output: &Path, time_step: f64) -> CoreResult<()> {
        self.record(EngineCall::File {
            frame0: frame0.to_path_buf(),
            frame1: frame1.to_path_buf(),
            output: output.to_path_buf(),
            time_step,
        })?;
        fs::write(output, format!("t={time_step}"))?;
        Ok(())
    }
}

/// Extractor that writes a fixed number of frames.
pub struct FakeExtractor {
    pub frames: u64,
    pub calls: RefCell<u32>,
}

impl FakeExtractor {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            calls: RefCell::new(0),
        }
    }
}

impl Extractor for FakeExtractor {
    fn extract(&self, _input_video: &Path, output_folder: &Path) -> CoreResult<u64> {
        *self.calls.borrow_mut() += 1;
        write_frames(output_folder, 1..=self.frames);
        Ok(self.frames)
    }
}

/// Encoder that records its arguments and writes an empty output file.
#[derive(Default)]
pub struct FakeEncoder {
    pub calls: RefCell<Vec<(PathBuf, PathBuf, f64)>>,
}

impl Encoder for FakeEncoder {
    fn encode(&self, input_folder: &Path, output_video: &Path, framerate: f64) -> CoreResult<()> {
        self.calls
            .borrow_mut()
            .push((input_folder.to_path_buf(), output_video.to_path_buf(), framerate));
        if let Some(parent) = output_video.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_video, b"")?;
        Ok(())
    }
}

/// Probe returning fixed rates.
pub struct FakeProbe {
    pub rates: StreamRates,
}

impl FakeProbe {
    pub fn new(real: &str, average: &str) -> Self {
        Self {
            rates: StreamRates {
                real_fps: real.to_string(),
                average_fps: average.to_string(),
            },
        }
    }
}

impl MetadataProbe for FakeProbe {
    fn probe(&self, _input_video: &Path) -> CoreResult<StreamRates> {
        Ok(self.rates.clone())
    }
}
