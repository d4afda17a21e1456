// framesmith-core/tests/engine_process_tests.rs
//
// Drives NcnnEngine against small shell scripts standing in for the
// ncnn-vulkan binaries.

#![cfg(unix)]

use framesmith_core::engine::{EngineKind, EngineSettings, InterpolationEngine, NcnnEngine};
use framesmith_core::error::{CoreError, ErrorCategory};
use framesmith_core::EngineErrorKind;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    let mut permissions = fs::metadata(&path).expect("script metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("Failed to make script executable");
    path
}

#[test]
fn test_successful_run_with_progress_lines() -> Result<(), Box<dyn std::error::Error>> {
    let bin = tempdir()?;
    let work = tempdir()?;
    let script = write_script(
        bin.path(),
        "rife-ncnn-vulkan",
        "echo '[0 Fake GPU]  queueC=2[8]' >&2\n\
         echo 'a.png b.png 0.500000 -> c.png done' >&2\n\
         echo 'a.png b.png 0.500000 -> d.png done' >&2\n\
         exit 0",
    );

    let engine = NcnnEngine::new(EngineKind::RifeNcnn, &script, EngineSettings::default());
    engine.folder_mode(&work.path().join("in"), &work.path().join("out"), Some(4))?;
    assert!(work.path().join("out").is_dir());
    Ok(())
}

#[test]
fn test_fatal_line_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    let bin = tempdir()?;
    let work = tempdir()?;
    let script = write_script(
        bin.path(),
        "dain-ncnn-vulkan",
        "echo '[0 Fake GPU]' >&2\n\
         echo 'vkAllocateMemory failed -2' >&2\n\
         sleep 5\n\
         exit 0",
    );

    let engine = NcnnEngine::new(EngineKind::DainNcnn, &script, EngineSettings::default());
    let err = engine
        .folder_mode(&work.path().join("in"), &work.path().join("out"), None)
        .unwrap_err();

    assert_eq!(err.engine_error_kind(), Some(EngineErrorKind::OutOfMemory));
    assert_eq!(err.category(), ErrorCategory::EngineInvocation);
    Ok(())
}

#[test]
fn test_model_not_found_in_file_mode() -> Result<(), Box<dyn std::error::Error>> {
    let bin = tempdir()?;
    let work = tempdir()?;
    let script = write_script(
        bin.path(),
        "cain-ncnn-vulkan",
        "echo 'fopen cain/cain.param failed' >&2\nexit 255",
    );

    let engine = NcnnEngine::new(EngineKind::CainNcnn, &script, EngineSettings::default());
    let err = engine
        .file_mode(
            &work.path().join("1.png"),
            &work.path().join("2.png"),
            &work.path().join("out").join("x.png"),
            0.5,
        )
        .unwrap_err();
    assert_eq!(err.engine_error_kind(), Some(EngineErrorKind::ModelNotFound));
    Ok(())
}

#[test]
fn test_unclassified_nonzero_exit() -> Result<(), Box<dyn std::error::Error>> {
    let bin = tempdir()?;
    let work = tempdir()?;
    let script = write_script(bin.path(), "dain-ncnn-vulkan", "echo 'something odd' >&2\nexit 3");

    let engine = NcnnEngine::new(EngineKind::DainNcnn, &script, EngineSettings::default());
    let err = engine
        .folder_mode(&work.path().join("in"), &work.path().join("out"), Some(2))
        .unwrap_err();
    assert!(matches!(err, CoreError::EngineExit { code: Some(3), .. }));
    Ok(())
}

#[test]
fn test_timeout_reported_as_exit() -> Result<(), Box<dyn std::error::Error>> {
    let bin = tempdir()?;
    let work = tempdir()?;
    let script = write_script(bin.path(), "dain-ncnn-vulkan", "exec sleep 30");

    let settings = EngineSettings {
        timeout: Some(Duration::from_millis(300)),
        ..EngineSettings::default()
    };
    let engine = NcnnEngine::new(EngineKind::DainNcnn, &script, settings);
    let err = engine
        .folder_mode(&work.path().join("in"), &work.path().join("out"), Some(2))
        .unwrap_err();
    assert!(matches!(err, CoreError::EngineExit { code: None, .. }));
    Ok(())
}

#[test]
fn test_missing_binary_fails_to_start() {
    let work = tempdir().unwrap();
    let engine = NcnnEngine::new(
        EngineKind::DainNcnn,
        work.path().join("no-such-engine"),
        EngineSettings::default(),
    );
    let err = engine
        .folder_mode(&work.path().join("in"), &work.path().join("out"), None)
        .unwrap_err();
    assert!(matches!(err, CoreError::CommandStart(..)));
}
