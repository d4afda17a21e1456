//! Frame-rate probing through the `ffprobe` crate.

use super::{MetadataProbe, StreamRates};
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// [`MetadataProbe`] that shells out to ffprobe.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataProbe for CrateFfprobeExecutor {
    fn probe(&self, input_video: &Path) -> CoreResult<StreamRates> {
        log::debug!("Running ffprobe for frame rates on: {}", input_video.display());
        let metadata = ffprobe(input_video).map_err(|err| {
            log::error!("ffprobe failed on {}: {err:?}", input_video.display());
            map_ffprobe_error(err, "frame rates")
        })?;

        let stream = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                CoreError::FfprobeParse(format!("No video stream found in {}", input_video.display()))
            })?;

        let rates = StreamRates {
            real_fps: stream.r_frame_rate.clone(),
            average_fps: stream.avg_frame_rate.clone(),
        };
        log::debug!(
            "Frame rates for {}: real {}, average {}",
            input_video.display(),
            rates.real_fps,
            rates.average_fps
        );
        Ok(rates)
    }
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::JsonParseError(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::io;

    #[test]
    fn test_map_io_error() {
        let err = map_ffprobe_error(
            FfProbeError::Io(io::Error::new(io::ErrorKind::NotFound, "ffprobe")),
            "frame rates",
        );
        assert!(matches!(err, CoreError::CommandStart(ref cmd, _) if cmd == "ffprobe (frame rates)"));
        assert_eq!(err.category(), ErrorCategory::UpstreamCollaborator);
    }
}
