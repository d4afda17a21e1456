//! Error types for the framesmith-core library.
//!
//! Every fallible operation in the crate returns [`CoreResult`]. Errors fall
//! into four categories (see [`ErrorCategory`]) which decide how the pipeline
//! reacts: configuration and engine errors abort the current stage, cleanup
//! filesystem errors are logged by their callers, and upstream collaborator
//! failures (ffmpeg, ffprobe) are always fatal.

use crate::engine::classifier::EngineErrorKind;
use crate::pipeline::Stage;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type used throughout the core library.
pub type CoreResult<T> = Result<T, CoreError>;

/// Custom error type for the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid frame multiplier {0}: must be a power of two greater than 1")]
    InvalidMultiplier(u32),

    #[error("Invalid frame rate '{0}'")]
    InvalidFrameRate(String),

    #[error("No frames found in {}", .0.display())]
    NoFrames(PathBuf),

    #[error("{engine} failed ({kind}): {message}")]
    Engine {
        engine: String,
        kind: EngineErrorKind,
        message: String,
    },

    #[error("{engine} exited with {} without reporting an error", describe_exit(.code))]
    EngineExit { engine: String, code: Option<i32> },

    #[error("Failed while {action} '{}': {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("{0} failed with {1}: {2}")]
    CommandFailed(String, String, String),

    #[error("Failed waiting for {0}: {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("ffprobe output parse error: {0}")]
    FfprobeParse(String),

    #[error("JSON error: {0}")]
    JsonParseError(String),

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<CoreError>,
    },
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    EngineInvocation,
    Filesystem,
    UpstreamCollaborator,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration error",
            Self::EngineInvocation => "engine invocation error",
            Self::Filesystem => "filesystem error",
            Self::UpstreamCollaborator => "upstream collaborator error",
        };
        f.write_str(name)
    }
}

impl CoreError {
    /// Returns the category of this error, looking through stage wrappers.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::InvalidMultiplier(_)
            | Self::InvalidFrameRate(_)
            | Self::NoFrames(_) => ErrorCategory::Configuration,
            Self::Engine { .. } | Self::EngineExit { .. } => ErrorCategory::EngineInvocation,
            Self::Io(_) | Self::Filesystem { .. } => ErrorCategory::Filesystem,
            Self::CommandStart(..)
            | Self::CommandFailed(..)
            | Self::CommandWait(..)
            | Self::DependencyNotFound(_)
            | Self::FfprobeParse(_)
            | Self::JsonParseError(_) => ErrorCategory::UpstreamCollaborator,
            Self::Stage { source, .. } => source.category(),
        }
    }

    /// Returns the classified engine failure kind, if this is one.
    pub fn engine_error_kind(&self) -> Option<EngineErrorKind> {
        match self {
            Self::Engine { kind, .. } => Some(*kind),
            Self::Stage { source, .. } => source.engine_error_kind(),
            _ => None,
        }
    }

    /// Returns the stage this error was raised in, if it was wrapped by the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Wraps this error with the pipeline stage it occurred in.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated)".to_string(),
    }
}

/// Creates an error for a command that could not be started.
pub fn command_start_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(command.into(), err)
}

/// Creates an error for a command that ran but finished unsuccessfully.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(command.into(), status.to_string(), stderr.into())
}

/// Creates an error for a failure while waiting on a running command.
pub fn command_wait_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(command.into(), err)
}

/// Creates a filesystem error tagged with the action and path involved.
pub fn fs_error(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> CoreError {
    CoreError::Filesystem {
        action,
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_looks_through_stage_wrapper() {
        let err = CoreError::Engine {
            engine: "dain-ncnn".to_string(),
            kind: EngineErrorKind::OutOfMemory,
            message: "vkAllocateMemory failed".to_string(),
        }
        .in_stage(Stage::Interpolate);

        assert_eq!(err.category(), ErrorCategory::EngineInvocation);
        assert_eq!(err.engine_error_kind(), Some(EngineErrorKind::OutOfMemory));
        assert_eq!(err.stage(), Some(Stage::Interpolate));
        let message = err.to_string();
        assert!(message.contains("interpolate"));
        assert!(message.contains("out of memory"));
    }

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = CoreError::InvalidMultiplier(3)
            .in_stage(Stage::Interpolate)
            .in_stage(Stage::Encode);
        assert_eq!(err.stage(), Some(Stage::Interpolate));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_engine_exit_message() {
        let err = CoreError::EngineExit {
            engine: "cain-ncnn".to_string(),
            code: Some(255),
        };
        assert_eq!(
            err.to_string(),
            "cain-ncnn exited with exit code 255 without reporting an error"
        );
        let killed = CoreError::EngineExit {
            engine: "cain-ncnn".to_string(),
            code: None,
        };
        assert!(killed.to_string().contains("terminated"));
    }
}
