//! Classification of interpolation engine output.
//!
//! The ncnn-vulkan engines have no structured IPC, so their stderr is the only
//! signal about progress and failures. A [`ProgressClassifier`] turns one line
//! of that output into exactly one [`ProgressEvent`]; the rules are selected by
//! engine identity through [`classifier_for`].

use super::EngineKind;
use std::fmt;

/// Kind of fatal failure reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    ModelNotFound,
    OutOfMemory,
    DeviceError,
    InvalidArgument,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModelNotFound => "model not found",
            Self::OutOfMemory => "out of memory",
            Self::DeviceError => "device error",
            Self::InvalidArgument => "invalid argument",
        };
        f.write_str(name)
    }
}

/// Semantic event derived from one line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Informational text (device banners, verbose output).
    Info(String),
    /// One frame completed.
    Tick,
    /// Fatal failure; the invocation must stop.
    Error(EngineErrorKind, String),
}

impl ProgressEvent {
    /// Returns true for events that end the invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Error(..))
    }
}

/// Maps raw engine output lines to [`ProgressEvent`]s.
///
/// Implementations must be total: every line maps to some event.
pub trait ProgressClassifier: Send + Sync {
    fn classify(&self, line: &str) -> ProgressEvent;
}

const TILESIZE_MARKERS: &[&str] = &["invalid tilesize argument"];
const MODEL_MARKERS: &[&str] = &["find_blob_index_by_name", "fopen"];
const MEMORY_MARKERS: &[&str] = &["vkAllocateMemory failed"];
const DEVICE_MARKERS: &[&str] = &[
    "vkWaitForFences failed",
    "vkQueueSubmit failed",
    "vkDeviceWaitIdle failed",
];
const DONE_MARKER: &str = "done";

/// Rules shared by the dain/cain/rife ncnn-vulkan builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NcnnVulkanClassifier;

impl ProgressClassifier for NcnnVulkanClassifier {
    fn classify(&self, line: &str) -> ProgressEvent {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.starts_with('[') {
            return ProgressEvent::Info(line.to_string());
        }
        if line.ends_with(DONE_MARKER) {
            return ProgressEvent::Tick;
        }

        let starts_with_any = |markers: &[&str]| markers.iter().any(|m| line.starts_with(m));
        let kind = if starts_with_any(TILESIZE_MARKERS) {
            Some(EngineErrorKind::InvalidArgument)
        } else if starts_with_any(MODEL_MARKERS) {
            Some(EngineErrorKind::ModelNotFound)
        } else if starts_with_any(MEMORY_MARKERS) {
            Some(EngineErrorKind::OutOfMemory)
        } else if starts_with_any(DEVICE_MARKERS) {
            Some(EngineErrorKind::DeviceError)
        } else {
            None
        };

        match kind {
            Some(kind) => ProgressEvent::Error(kind, line.to_string()),
            None => ProgressEvent::Info(line.to_string()),
        }
    }
}

/// Returns the classifier for the given engine family.
pub fn classifier_for(kind: EngineKind) -> Box<dyn ProgressClassifier> {
    match kind {
        EngineKind::DainNcnn | EngineKind::CainNcnn | EngineKind::RifeNcnn => {
            Box::new(NcnnVulkanClassifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "\
[0 NVIDIA GeForce RTX 3070]  queueC=2[8]  queueG=0[16]  queueT=1[2]
[0 NVIDIA GeForce RTX 3070]  bugsbn1=0  bugbilz=0  bugcopc=0  bugihfa=0
/tmp/in/00000001.png /tmp/in/00000002.png 0.500000 -> /tmp/out/00000002.png done
/tmp/in/00000002.png /tmp/in/00000003.png 0.500000 -> /tmp/out/00000004.png done
some unexpected diagnostic
vkAllocateMemory failed -2
/tmp/in/00000003.png /tmp/in/00000004.png 0.500000 -> /tmp/out/00000006.png done
";

    #[test]
    fn test_banner_lines_are_info() {
        let event = NcnnVulkanClassifier.classify("[0 Intel(R) UHD Graphics 620]  queueC=0[1]");
        assert!(matches!(event, ProgressEvent::Info(text) if text.starts_with("[0 Intel")));
    }

    #[test]
    fn test_done_lines_are_ticks() {
        assert_eq!(
            NcnnVulkanClassifier.classify("a.png b.png 0.5 -> c.png done\n"),
            ProgressEvent::Tick
        );
    }

    #[test]
    fn test_error_markers() {
        let cases = [
            ("invalid tilesize argument", EngineErrorKind::InvalidArgument),
            ("find_blob_index_by_name input0 failed", EngineErrorKind::ModelNotFound),
            ("fopen best.param failed", EngineErrorKind::ModelNotFound),
            ("vkAllocateMemory failed -2", EngineErrorKind::OutOfMemory),
            ("vkWaitForFences failed -4", EngineErrorKind::DeviceError),
            ("vkQueueSubmit failed -4", EngineErrorKind::DeviceError),
            ("vkDeviceWaitIdle failed -4", EngineErrorKind::DeviceError),
        ];
        for (line, expected) in cases {
            match NcnnVulkanClassifier.classify(line) {
                ProgressEvent::Error(kind, message) => {
                    assert_eq!(kind, expected, "line: {line}");
                    assert_eq!(message, line);
                }
                other => panic!("expected error for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_lines_pass_through() {
        assert_eq!(
            NcnnVulkanClassifier.classify("Usage: dain-ncnn-vulkan -0 infile"),
            ProgressEvent::Info("Usage: dain-ncnn-vulkan -0 infile".to_string())
        );
        assert_eq!(
            NcnnVulkanClassifier.classify(""),
            ProgressEvent::Info(String::new())
        );
    }

    #[test]
    fn test_transcript_is_classified_totally() {
        let classifier = classifier_for(EngineKind::DainNcnn);
        let events: Vec<ProgressEvent> = TRANSCRIPT.lines().map(|l| classifier.classify(l)).collect();
        assert_eq!(events.len(), TRANSCRIPT.lines().count());

        let ticks = events.iter().filter(|e| **e == ProgressEvent::Tick).count();
        let infos = events.iter().filter(|e| matches!(e, ProgressEvent::Info(_))).count();
        let fatal = events.iter().filter(|e| e.is_fatal()).count();
        assert_eq!((ticks, infos, fatal), (3, 3, 1));
    }
}
